//! # Diagnostics
//!
//! This module defines the unified, `miette`-based diagnostic system for macropp. Every
//! failure produced by the reader, the expander, the host evaluator, configuration loading
//! or stream I/O is a [`PreprocessError`].
//!
//! # Error Construction Macros
//!
//! - **Use `err_msg!` for simple, message-only errors.**
//!   - `err_msg!(HostEvaluation, "no operator named '{}'", name)`
//!
//! - **Use `err_ctx!` for errors with a source and span.**
//!   - `err_ctx!(MalformedExpression, "unterminated string", &src, span)`
//!   - `err_ctx!(MalformedExpression, "unterminated string", &src, span, "close it with '\"'")`
//!
//! Every variant has the same three fields (`message`, `ctx`, `source`), so both macros
//! work for all of them.
//!
//! There is no `UnknownMacro` variant: a list whose head is not a registered
//! function-macro is expanded element-wise and never reported.

use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode};
use thiserror::Error;

use crate::ast::Span;

pub type SourceArc = Arc<NamedSource<String>>;

/// Type-safe error classification that corresponds to [`PreprocessError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// Unbalanced delimiters, bad string literals, stray `)`
    MalformedExpression,
    /// Input ended before a directive could read its expression
    UnexpectedEof,
    /// A transformer or template failed, or the depth limit was hit
    MacroExpansion,
    /// The host evaluator rejected an expression
    HostEvaluation,
    /// Invalid configuration file or prefix table
    Config,
    /// Underlying read or write failure
    Io,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::MalformedExpression => "MalformedExpression",
            ErrorType::UnexpectedEof => "UnexpectedEof",
            ErrorType::MacroExpansion => "MacroExpansion",
            ErrorType::HostEvaluation => "HostEvaluation",
            ErrorType::Config => "Config",
            ErrorType::Io => "Io",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Minimal, composable error context for diagnostics.
#[derive(Debug, Default)]
pub struct ErrorContext {
    /// The primary source for this error (if any).
    pub source: Option<SourceArc>,
    /// The primary span for this error (if any).
    pub span: Option<Span>,
    /// An optional help message.
    pub help: Option<String>,
}

impl ErrorContext {
    /// Returns an empty error context (no source, span, or help).
    pub fn none() -> Self {
        Self::default()
    }

    /// Creates a context with both source and span.
    pub fn with_source_and_span(source: SourceArc, span: Span) -> Self {
        Self {
            source: Some(source),
            span: Some(span),
            help: None,
        }
    }

    /// Creates a context with source, span, and help message.
    pub fn with_all(source: SourceArc, span: Span, help: String) -> Self {
        Self {
            source: Some(source),
            span: Some(span),
            help: Some(help),
        }
    }
}

/// Unified error type for all macropp failure modes.
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Malformed expression: {message}")]
    MalformedExpression {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Unexpected end of input: {message}")]
    UnexpectedEof {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Macro expansion failed: {message}")]
    MacroExpansion {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Host evaluation failed: {message}")]
    HostEvaluation {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("I/O error: {message}")]
    Io {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
}

impl PreprocessError {
    pub(crate) fn get_ctx(&self) -> &ErrorContext {
        match self {
            PreprocessError::MalformedExpression { ctx, .. } => ctx,
            PreprocessError::UnexpectedEof { ctx, .. } => ctx,
            PreprocessError::MacroExpansion { ctx, .. } => ctx,
            PreprocessError::HostEvaluation { ctx, .. } => ctx,
            PreprocessError::Config { ctx, .. } => ctx,
            PreprocessError::Io { ctx, .. } => ctx,
        }
    }

    fn message(&self) -> &str {
        match self {
            PreprocessError::MalformedExpression { message, .. }
            | PreprocessError::UnexpectedEof { message, .. }
            | PreprocessError::MacroExpansion { message, .. }
            | PreprocessError::HostEvaluation { message, .. }
            | PreprocessError::Config { message, .. }
            | PreprocessError::Io { message, .. } => message,
        }
    }

    /// Returns the type-safe error classification for this error.
    pub fn error_type(&self) -> ErrorType {
        match self {
            PreprocessError::MalformedExpression { .. } => ErrorType::MalformedExpression,
            PreprocessError::UnexpectedEof { .. } => ErrorType::UnexpectedEof,
            PreprocessError::MacroExpansion { .. } => ErrorType::MacroExpansion,
            PreprocessError::HostEvaluation { .. } => ErrorType::HostEvaluation,
            PreprocessError::Config { .. } => ErrorType::Config,
            PreprocessError::Io { .. } => ErrorType::Io,
        }
    }

    /// Attaches a cause to an existing error.
    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        match &mut self {
            PreprocessError::MalformedExpression { source, .. }
            | PreprocessError::UnexpectedEof { source, .. }
            | PreprocessError::MacroExpansion { source, .. }
            | PreprocessError::HostEvaluation { source, .. }
            | PreprocessError::Config { source, .. }
            | PreprocessError::Io { source, .. } => *source = Some(Box::new(cause)),
        }
        self
    }

    /// Sets the help text, replacing any existing one.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        match &mut self {
            PreprocessError::MalformedExpression { ctx, .. }
            | PreprocessError::UnexpectedEof { ctx, .. }
            | PreprocessError::MacroExpansion { ctx, .. }
            | PreprocessError::HostEvaluation { ctx, .. }
            | PreprocessError::Config { ctx, .. }
            | PreprocessError::Io { ctx, .. } => ctx.help = Some(help.into()),
        }
        self
    }
}

impl From<std::io::Error> for PreprocessError {
    fn from(err: std::io::Error) -> Self {
        crate::err_msg!(Io, "{}", err).with_cause(err)
    }
}

impl Diagnostic for PreprocessError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let code = match self {
            PreprocessError::MalformedExpression { .. } => "macropp::reader::malformed",
            PreprocessError::UnexpectedEof { .. } => "macropp::reader::eof",
            PreprocessError::MacroExpansion { .. } => "macropp::expand",
            PreprocessError::HostEvaluation { .. } => "macropp::host",
            PreprocessError::Config { .. } => "macropp::config",
            PreprocessError::Io { .. } => "macropp::io",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.get_ctx()
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn std::fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.get_ctx()
            .source
            .as_ref()
            .map(|s| s.as_ref() as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let ctx = self.get_ctx();
        // Spans without a source would point into nothing.
        ctx.source.as_ref()?;
        let span = ctx.span?;
        let label = LabeledSpan::new(
            Some(self.message().to_string()),
            span.start,
            span.len().max(1),
        );
        Some(Box::new(std::iter::once(label)))
    }
}

/// Converts a source string into an `Arc<NamedSource<String>>` for use in error contexts.
pub fn to_error_source(name: &str, source: impl Into<String>) -> SourceArc {
    Arc::new(NamedSource::new(name, source.into()))
}

/// Constructs a `PreprocessError` variant with a formatted message and no context.
#[macro_export]
macro_rules! err_msg {
    ($variant:ident, $($arg:tt)+) => {
        $crate::PreprocessError::$variant {
            message: format!($($arg)+),
            ctx: $crate::ErrorContext::none(),
            source: None,
        }
    };
}

/// Constructs a `PreprocessError` variant with a message, a source and a span, plus an
/// optional help message.
#[macro_export]
macro_rules! err_ctx {
    ($variant:ident, $msg:expr, $src:expr, $span:expr, $help:expr) => {
        $crate::PreprocessError::$variant {
            message: $msg.to_string(),
            ctx: $crate::ErrorContext::with_all(
                $crate::diagnostics::SourceArc::clone($src),
                $span,
                format!("{}", $help),
            ),
            source: None,
        }
    };
    ($variant:ident, $msg:expr, $src:expr, $span:expr) => {
        $crate::PreprocessError::$variant {
            message: $msg.to_string(),
            ctx: $crate::ErrorContext::with_source_and_span(
                $crate::diagnostics::SourceArc::clone($src),
                $span,
            ),
            source: None,
        }
    };
}

#[cfg(test)]
mod diagnostics_tests {
    use miette::Report;

    use super::*;

    #[test]
    fn test_report_contains_label_and_help() {
        let src = to_error_source("input.txt", "#:(foo \"bar");
        let err = err_ctx!(
            MalformedExpression,
            "unterminated string",
            &src,
            Span { start: 7, end: 11 },
            "add a closing '\"'"
        );
        let output = format!("{:?}", Report::new(err));
        assert!(output.contains("unterminated string"));
        assert!(output.contains("add a closing"));
        assert!(output.contains("macropp::reader::malformed"));
    }

    #[test]
    fn test_error_chaining() {
        let cause = err_msg!(HostEvaluation, "no operator named '{}'", "frob");
        let err = err_msg!(HostEvaluation, "directive failed").with_cause(cause);
        let output = format!("{:?}", Report::new(err));
        assert!(output.contains("directive failed"));
        assert!(output.contains("frob"));
    }

    #[test]
    fn test_causes_are_reachable_through_source() {
        use std::error::Error as _;

        let plain = err_msg!(MacroExpansion, "no cause");
        assert!(plain.source().is_none());

        let err = err_msg!(Config, "bad config").with_cause(err_msg!(Io, "disk gone"));
        let cause = err.source().expect("cause should be chained");
        assert!(cause.to_string().contains("disk gone"));
    }

    #[test]
    fn test_io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: PreprocessError = io.into();
        assert_eq!(err.error_type(), ErrorType::Io);
        assert!(err.to_string().contains("pipe closed"));
    }

    #[test]
    fn test_sourceless_errors_have_no_labels() {
        let err = PreprocessError::Config {
            message: "empty prefix".to_string(),
            ctx: ErrorContext {
                span: Some(Span { start: 0, end: 1 }),
                ..ErrorContext::none()
            },
            source: None,
        };
        assert!(err.labels().is_none());
        assert_eq!(err.error_type().to_string(), "Config");
    }
}
