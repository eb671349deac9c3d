//! Macro expansion engine.
//!
//! A single pass over the tree, node by node:
//!
//! - a list headed by a registered function macro has its arguments expanded left to
//!   right, then the transformer is applied to them; in recursive mode the result is
//!   expanded again;
//! - an atom registered as a symbol macro is replaced by its substitute (one step);
//! - any other list is rebuilt with every element expanded. This includes lists whose
//!   head atom is not registered;
//! - strings and unregistered atoms are returned unchanged.
//!
//! Termination is the macro author's responsibility. The depth limit only turns a
//! runaway recursive expansion into an error instead of a stack overflow.

use crate::ast::Expr;
use crate::macros::registry::MacroRegistry;
use crate::macros::types::{ExpansionStep, MacroKind};
use crate::{err_msg, PreprocessError};

/// Default limit on chained macro re-expansions.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Expands `expr` against `registry` with the default depth limit and no trace.
///
/// # Examples
///
/// ```rust
/// use macropp::ast::Expr;
/// use macropp::macros::{expand, MacroRegistry};
/// let mut registry = MacroRegistry::new();
/// registry.define_symbol_macro("pi", Expr::atom("3.14159"));
/// let out = expand(&Expr::atom("pi"), &registry, false).unwrap();
/// assert_eq!(out, Expr::atom("3.14159"));
/// ```
pub fn expand(expr: &Expr, registry: &MacroRegistry, recursive: bool) -> Result<Expr, PreprocessError> {
    Expander::new(registry).recursive(recursive).expand(expr)
}

pub struct Expander<'r> {
    registry: &'r MacroRegistry,
    recursive: bool,
    max_depth: usize,
    trace: Option<Vec<ExpansionStep>>,
}

impl<'r> Expander<'r> {
    pub fn new(registry: &'r MacroRegistry) -> Self {
        Self {
            registry,
            recursive: false,
            max_depth: DEFAULT_MAX_DEPTH,
            trace: None,
        }
    }

    /// Whether macro output is itself expanded again.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Records every macro application; read it back with [`Expander::take_trace`].
    pub fn with_trace(mut self) -> Self {
        self.trace = Some(Vec::new());
        self
    }

    pub fn take_trace(&mut self) -> Vec<ExpansionStep> {
        self.trace.as_mut().map(std::mem::take).unwrap_or_default()
    }

    pub fn expand(&mut self, expr: &Expr) -> Result<Expr, PreprocessError> {
        self.expand_at(expr, 0)
    }

    /// Expands each argument, left to right.
    pub fn expand_all(&mut self, exprs: &[Expr]) -> Result<Vec<Expr>, PreprocessError> {
        self.expand_each(exprs, 0)
    }

    // `depth` counts chained re-expansions of macro output, not tree depth.
    fn expand_at(&mut self, expr: &Expr, depth: usize) -> Result<Expr, PreprocessError> {
        match expr {
            Expr::List(items) => {
                if let Some(head) = expr.macro_head() {
                    if let Some(mac) = self.registry.lookup_function_macro(head) {
                        if depth >= self.max_depth {
                            return Err(err_msg!(
                                MacroExpansion,
                                "expansion of '{}' exceeded the depth limit of {}",
                                head,
                                self.max_depth
                            )
                            .with_help("a macro probably expands into a call to itself"));
                        }
                        let args = self.expand_each(&items[1..], depth)?;
                        let produced = mac.call(&args)?;
                        tracing::trace!(macro_name = %head, output = %produced, "function macro applied");
                        self.record(ExpansionStep {
                            macro_name: head.clone(),
                            kind: MacroKind::Function,
                            input: expr.clone(),
                            output: produced.clone(),
                        });
                        return if self.recursive {
                            self.expand_at(&produced, depth + 1)
                        } else {
                            Ok(produced)
                        };
                    }
                }
                Ok(Expr::List(self.expand_each(items, depth)?))
            }
            Expr::Atom(sym) => match self.registry.lookup_symbol_macro(sym) {
                Some(substitute) => {
                    tracing::trace!(symbol = %sym, "symbol macro substituted");
                    self.record(ExpansionStep {
                        macro_name: sym.clone(),
                        kind: MacroKind::Symbol,
                        input: expr.clone(),
                        output: substitute.clone(),
                    });
                    Ok(substitute)
                }
                None => Ok(expr.clone()),
            },
            Expr::Str(_) => Ok(expr.clone()),
        }
    }

    fn expand_each(&mut self, exprs: &[Expr], depth: usize) -> Result<Vec<Expr>, PreprocessError> {
        exprs.iter().map(|e| self.expand_at(e, depth)).collect()
    }

    fn record(&mut self, step: ExpansionStep) {
        if let Some(trace) = self.trace.as_mut() {
            trace.push(step);
        }
    }
}
