//! # Macro System
//!
//! Purely syntactic rewriting of expressions before they are printed, rendered or
//! handed to the host evaluator.
//!
//! - [`types`]: transformers, templates and trace steps.
//! - [`registry`]: the two macro tables and scoped overrides.
//! - [`expander`]: the recursive rewrite.
//!
//! Function macros and symbol macros never compete for the same expression: the first
//! applies only to lists with an atom head, the second only to atoms.

pub mod expander;
pub mod registry;
pub mod types;

pub use expander::{expand, Expander, DEFAULT_MAX_DEPTH};
pub use registry::MacroRegistry;
pub use types::{ExpansionStep, FunctionMacro, MacroKind, MacroTemplate, ParamList, TransformFn};
