//! Defines the command-line arguments and subcommands for the macropp CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "macropp",
    version,
    about = "A prefix-driven text preprocessor with s-expression macros."
)]
pub struct MacroppArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Preprocess a document, expanding every prefix directive.
    Process {
        /// Input file; standard input when omitted.
        input: Option<PathBuf>,
        /// Output file; standard output when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        config: ConfigArgs,
        /// Run the directives but write nothing.
        #[arg(short, long)]
        quiet: bool,
    },
    /// Print the macro expansion of every expression in a file.
    Expand {
        /// The file of expressions to expand.
        #[arg(required = true)]
        file: PathBuf,
        #[command(flatten)]
        config: ConfigArgs,
        /// Show each expansion step with diffs.
        #[arg(long)]
        trace: bool,
    },
    /// List the effective prefix table.
    Prefixes {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// YAML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Re-expand macro output until no macros remain.
    #[arg(short, long)]
    pub recursive: bool,
}
