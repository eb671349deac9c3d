use std::io::{BufRead, Write};

use crate::config::{Config, Settings};
use crate::dispatch::{maybe_dispatch, DirectiveContext, PrefixTable};
use crate::macros::MacroRegistry;
use crate::output::{NullSink, OutputBuffer, OutputSink, WriterSink};
use crate::runtime::{DefinitionEvaluator, HostEvaluator};
use crate::syntax::CharStream;
use crate::PreprocessError;

// ============================================================================
// PREPROCESSOR - Owns the state of one run
// ============================================================================

/// The stream driver.
///
/// Owns the macro registry for the lifetime of the run, the prefix table and the host
/// evaluator. Directives see the registry through a [`DirectiveContext`]; definitions
/// made by one directive are visible to every later one.
pub struct Preprocessor {
    registry: MacroRegistry,
    prefixes: PrefixTable,
    host: Box<dyn HostEvaluator>,
    settings: Settings,
}

impl Default for Preprocessor {
    /// Standard prefixes, default settings, the definition evaluator as host.
    fn default() -> Self {
        let settings = Settings::default();
        Self::with_parts(
            PrefixTable::standard(),
            Box::new(DefinitionEvaluator::new(settings)),
            settings,
        )
    }
}

impl Preprocessor {
    pub fn new(config: &Config) -> Result<Self, PreprocessError> {
        config.validate()?;
        let settings = config.settings();
        Ok(Self::with_parts(
            config.prefix_table()?,
            Box::new(DefinitionEvaluator::new(settings)),
            settings,
        ))
    }

    pub fn with_parts(prefixes: PrefixTable, host: Box<dyn HostEvaluator>, settings: Settings) -> Self {
        Self {
            registry: MacroRegistry::new(),
            prefixes,
            host,
            settings,
        }
    }

    /// Replaces the host evaluator.
    pub fn with_host(mut self, host: impl HostEvaluator + 'static) -> Self {
        self.host = Box::new(host);
        self
    }

    pub fn registry(&self) -> &MacroRegistry {
        &self.registry
    }

    /// Lets embedders install macros before (or between) runs.
    pub fn registry_mut(&mut self) -> &mut MacroRegistry {
        &mut self.registry
    }

    pub fn prefixes(&self) -> &PrefixTable {
        &self.prefixes
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // ------------------------------------------------------------------------
    // Running
    // ------------------------------------------------------------------------

    /// Preprocesses `input` into `output`. With `None`, directives still run but
    /// nothing is written.
    pub fn process(&mut self, input: impl BufRead, output: Option<&mut dyn Write>) -> Result<(), PreprocessError> {
        self.process_named("<input>", input, output)
    }

    /// As [`Preprocessor::process`], labelling the input `name` in diagnostics.
    pub fn process_named(
        &mut self,
        name: &str,
        input: impl BufRead,
        output: Option<&mut dyn Write>,
    ) -> Result<(), PreprocessError> {
        let mut stream = CharStream::new(name, input);
        match output {
            Some(writer) => self.process_stream(&mut stream, &mut WriterSink::new(writer)),
            None => self.process_stream(&mut stream, &mut NullSink),
        }
    }

    /// Preprocesses a string and returns the output.
    pub fn process_str(&mut self, text: &str) -> Result<String, PreprocessError> {
        let mut stream = CharStream::from_text("<string>", text);
        let mut out = OutputBuffer::new();
        self.process_stream(&mut stream, &mut out)?;
        Ok(out.into_string())
    }

    pub fn process_stream(
        &mut self,
        input: &mut CharStream<'_>,
        output: &mut dyn OutputSink,
    ) -> Result<(), PreprocessError> {
        let Preprocessor {
            registry,
            prefixes,
            host,
            settings,
        } = self;
        let mut cx = DirectiveContext {
            registry,
            host: &mut **host,
            settings,
        };
        tracing::debug!(input = input.name(), prefixes = prefixes.entries().len(), "processing");
        loop {
            // Diagnostics only ever point at the directive being read.
            input.mark();
            let Some(c) = input.next_char()? else {
                break;
            };
            if !maybe_dispatch(prefixes, &mut cx, input, output, c)? {
                output.emit_char(c)?;
            }
        }
        output.flush()
    }
}
