//! The macropp Command-Line Interface.
//!
//! This module is the main entry point for all CLI commands and orchestrates
//! the core library functions.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::process;
use std::sync::Once;

use clap::Parser;

use crate::ast::Expr;
use crate::cli::args::{Command, ConfigArgs, MacroppArgs};
use crate::config::Config;
use crate::macros::{Expander, MacroRegistry};
use crate::runtime::{DefinitionEvaluator, HostEvaluator};
use crate::syntax::{read_all, CharStream, ReadCase};
use crate::{err_msg, Preprocessor, PreprocessError};

pub mod args;
pub mod output;

static TRACING_INIT: Once = Once::new();

/// The main entry point for the CLI.
pub fn run() {
    init_tracing();
    let args = MacroppArgs::parse();

    let result = match args.command {
        Command::Process {
            input,
            output,
            config,
            quiet,
        } => handle_process(input.as_deref(), output.as_deref(), &config, quiet),
        Command::Expand { file, config, trace } => handle_expand(&file, &config, trace),
        Command::Prefixes { config } => handle_prefixes(&config),
    };

    if let Err(e) = result {
        output::print_error(e);
        process::exit(1);
    }
}

/// Installs a stderr subscriber, only when `RUST_LOG` is set.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr).with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

fn load_config(args: &ConfigArgs) -> Result<Config, PreprocessError> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if args.recursive {
        config.recursive = true;
    }
    Ok(config)
}

fn open_input(path: &Path) -> Result<BufReader<File>, PreprocessError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| err_msg!(Io, "cannot open '{}'", path.display()).with_cause(e))
}

/// Handles the `process` subcommand.
fn handle_process(
    input: Option<&Path>,
    output: Option<&Path>,
    config: &ConfigArgs,
    quiet: bool,
) -> Result<(), PreprocessError> {
    let mut preprocessor = Preprocessor::new(&load_config(config)?)?;

    let (name, reader) = match input {
        Some(path) => (
            path.display().to_string(),
            Box::new(open_input(path)?) as Box<dyn BufRead>,
        ),
        None => ("<stdin>".to_string(), Box::new(io::stdin().lock()) as Box<dyn BufRead>),
    };

    if quiet {
        return preprocessor.process_named(&name, reader, None);
    }
    let mut writer = match output {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                err_msg!(Io, "cannot create '{}'", path.display()).with_cause(e)
            })?;
            Box::new(BufWriter::new(file)) as Box<dyn Write>
        }
        None => Box::new(io::stdout().lock()) as Box<dyn Write>,
    };
    preprocessor.process_named(&name, reader, Some(&mut *writer))
}

/// Handles the `expand` subcommand.
///
/// Definition forms are evaluated so later expressions can use them; every other
/// expression is printed expanded, one per line.
fn handle_expand(path: &Path, config: &ConfigArgs, trace: bool) -> Result<(), PreprocessError> {
    let config = load_config(config)?;
    let settings = config.settings();
    let mut stream = CharStream::new(path.display().to_string(), open_input(path)?);
    let exprs = read_all(&mut stream, ReadCase::Fold(settings.case_fold))?;

    let mut registry = MacroRegistry::new();
    let mut host = DefinitionEvaluator::new(settings);
    let mut stdout = io::stdout().lock();
    for expr in &exprs {
        if is_definition(expr) {
            host.evaluate(expr, &mut registry)?;
            continue;
        }
        let mut expander = Expander::new(&registry)
            .recursive(settings.recursive)
            .max_depth(settings.max_depth);
        if trace {
            expander = expander.with_trace();
        }
        let expanded = expander.expand(expr)?;
        if trace {
            output::print_trace(&expander.take_trace())?;
        }
        writeln!(stdout, "{}", expanded)?;
    }
    Ok(())
}

fn is_definition(expr: &Expr) -> bool {
    matches!(
        expr.macro_head().map(|head| head.as_str()),
        Some("define-macro" | "define-symbol-macro")
    )
}

/// Handles the `prefixes` subcommand.
fn handle_prefixes(config: &ConfigArgs) -> Result<(), PreprocessError> {
    let table = load_config(config)?.prefix_table()?;
    let mut stdout = io::stdout().lock();
    for entry in table.entries() {
        writeln!(stdout, "{:<8} {}", entry.prefix, entry.handler.name())?;
    }
    Ok(())
}
