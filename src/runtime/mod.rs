//! Host evaluation.
//!
//! Two directive kinds hand their expression to a [`HostEvaluator`]. The preprocessor
//! only depends on this trait; [`DefinitionEvaluator`] is the evaluator the CLI uses.

use crate::ast::Expr;
use crate::macros::MacroRegistry;
use crate::PreprocessError;

pub mod definitions;

pub use definitions::DefinitionEvaluator;

/// Evaluates an expression on behalf of a directive.
///
/// The registry is passed in so evaluation can define macros. Failures should be
/// reported as `PreprocessError::HostEvaluation`; they are propagated unchanged.
pub trait HostEvaluator {
    fn evaluate(&mut self, expr: &Expr, registry: &mut MacroRegistry) -> Result<Expr, PreprocessError>;
}

impl<F> HostEvaluator for F
where
    F: FnMut(&Expr, &mut MacroRegistry) -> Result<Expr, PreprocessError>,
{
    fn evaluate(&mut self, expr: &Expr, registry: &mut MacroRegistry) -> Result<Expr, PreprocessError> {
        self(expr, registry)
    }
}
