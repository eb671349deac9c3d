//! macropp: a prefix-driven text preprocessor.
//!
//! Text is copied from input to output unchanged until a configured prefix such as `#:`
//! appears. The expression after the prefix is read, macro-expanded, evaluated or
//! rendered, and the result takes its place in the output.
//!
//! ```
//! use macropp::Preprocessor;
//!
//! let mut pp = Preprocessor::default();
//! let out = pp
//!     .process_str("#.(define-macro (double x) (x x))pi is #:(double 3)")
//!     .unwrap();
//! assert_eq!(out, "pi is (3 3)");
//! ```

pub use crate::diagnostics::{ErrorContext, ErrorType, PreprocessError};
pub use crate::engine::Preprocessor;

pub mod ast;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod dispatch;
pub mod engine;
pub mod macros;
pub mod output;
pub mod render;
pub mod runtime;
pub mod syntax;
