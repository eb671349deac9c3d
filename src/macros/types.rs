//! Core macro types.
//!
//! This module has no dependencies on the other macro modules.
//!
//! ## Ownership
//!
//! - `FunctionMacro` is an `Rc`-shared transformer, cheap to clone into and out of the
//!   registry (scoped overrides snapshot by cloning).
//! - `MacroTemplate` owns its parameters and body.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::{Expr, Symbol};
use crate::{err_msg, PreprocessError};

/// Signature of a function-macro transformer: expanded arguments in, new expression out.
pub type TransformFn = dyn Fn(&[Expr]) -> Result<Expr, PreprocessError>;

/// A registered expression-rewriting macro.
///
/// # Examples
///
/// ```rust
/// use macropp::ast::Expr;
/// use macropp::macros::FunctionMacro;
/// let double = FunctionMacro::new(|args| {
///     let x = args.first().cloned().unwrap_or_else(Expr::nil);
///     Ok(Expr::list(vec![x.clone(), x]))
/// });
/// let out = double.call(&[Expr::atom("3")]).unwrap();
/// assert_eq!(out.to_string(), "(3 3)");
/// ```
#[derive(Clone)]
pub struct FunctionMacro {
    transform: Rc<TransformFn>,
    template: Option<Rc<MacroTemplate>>,
}

impl FunctionMacro {
    pub fn new<F>(transform: F) -> Self
    where
        F: Fn(&[Expr]) -> Result<Expr, PreprocessError> + 'static,
    {
        Self {
            transform: Rc::new(transform),
            template: None,
        }
    }

    /// Wraps a declarative template as a transformer.
    pub fn from_template(template: MacroTemplate) -> Self {
        let template = Rc::new(template);
        let body = Rc::clone(&template);
        Self {
            transform: Rc::new(move |args: &[Expr]| body.instantiate(args)),
            template: Some(template),
        }
    }

    pub fn call(&self, args: &[Expr]) -> Result<Expr, PreprocessError> {
        (self.transform)(args)
    }

    /// The template this macro was built from, if any.
    pub fn template(&self) -> Option<&MacroTemplate> {
        self.template.as_deref()
    }
}

/// Two handles are equal when they share the same transformer.
impl PartialEq for FunctionMacro {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.transform, &other.transform)
    }
}

impl fmt::Debug for FunctionMacro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.template {
            Some(template) => write!(f, "FunctionMacro({})", template),
            None => write!(f, "FunctionMacro(<native {:p}>)", Rc::as_ptr(&self.transform)),
        }
    }
}

// ============================================================================
// TEMPLATES
// ============================================================================

/// Formal parameters of a template macro.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamList {
    pub required: Vec<Symbol>,
    /// Collects any arguments past `required`; written `...name` in a definition.
    pub rest: Option<Symbol>,
}

impl ParamList {
    pub fn arity_text(&self) -> String {
        match self.rest {
            Some(_) => format!("at least {}", self.required.len()),
            None => format!("exactly {}", self.required.len()),
        }
    }
}

/// A declarative macro: parameters substituted into a body.
///
/// Substitution replaces parameter atoms anywhere in the body except inside
/// `(quote ...)`. A rest parameter used as a list element splices its arguments in place.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroTemplate {
    pub name: Symbol,
    pub params: ParamList,
    pub body: Expr,
}

impl MacroTemplate {
    pub fn new(name: Symbol, params: ParamList, body: Expr) -> Self {
        Self { name, params, body }
    }

    /// Expands the template with the given arguments.
    pub fn instantiate(&self, args: &[Expr]) -> Result<Expr, PreprocessError> {
        let required = self.params.required.len();
        let arity_ok = match self.params.rest {
            Some(_) => args.len() >= required,
            None => args.len() == required,
        };
        if !arity_ok {
            return Err(err_msg!(
                MacroExpansion,
                "macro '{}' expects {} argument(s), got {}",
                self.name,
                self.params.arity_text(),
                args.len()
            ));
        }

        let mut bindings: HashMap<&str, Binding<'_>> = self
            .params
            .required
            .iter()
            .zip(args)
            .map(|(param, arg)| (param.as_str(), Binding::One(arg)))
            .collect();
        if let Some(rest) = &self.params.rest {
            let rest_args = Binding::Many(&args[required..]);
            bindings.insert(rest.as_str(), rest_args);
        }
        Ok(substitute(&self.body, &bindings))
    }
}

impl fmt::Display for MacroTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.name)?;
        for param in &self.params.required {
            write!(f, " {}", param)?;
        }
        if let Some(rest) = &self.params.rest {
            write!(f, " ...{}", rest)?;
        }
        write!(f, ") {}", self.body)
    }
}

enum Binding<'a> {
    One(&'a Expr),
    Many(&'a [Expr]),
}

// Accepts both `rest` and `...rest` as references to a rest parameter.
fn lookup<'b, 'a>(bindings: &'b HashMap<&str, Binding<'a>>, name: &str) -> Option<&'b Binding<'a>> {
    bindings
        .get(name)
        .or_else(|| name.strip_prefix("...").and_then(|n| bindings.get(n)))
}

fn substitute(expr: &Expr, bindings: &HashMap<&str, Binding<'_>>) -> Expr {
    match expr {
        Expr::Atom(sym) => match lookup(bindings, sym.as_str()) {
            Some(Binding::One(arg)) => (*arg).clone(),
            Some(Binding::Many(args)) => Expr::List(args.to_vec()),
            None => expr.clone(),
        },
        Expr::List(items) if items.first().is_some_and(|h| h.is_atom_named("quote")) => {
            expr.clone()
        }
        Expr::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Expr::Atom(sym) => match lookup(bindings, sym.as_str()) {
                        Some(Binding::Many(args)) => out.extend(args.iter().cloned()),
                        _ => out.push(substitute(item, bindings)),
                    },
                    _ => out.push(substitute(item, bindings)),
                }
            }
            Expr::List(out)
        }
        Expr::Str(_) => expr.clone(),
    }
}

// ============================================================================
// TRACE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroKind {
    Function,
    Symbol,
}

/// A single expansion step, for traceability.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionStep {
    pub macro_name: Symbol,
    pub kind: MacroKind,
    /// The expression before this step.
    pub input: Expr,
    /// The expression the macro produced.
    pub output: Expr,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorType;

    fn sym(name: &str) -> Symbol {
        Symbol::new(name)
    }

    fn swap_template() -> MacroTemplate {
        MacroTemplate::new(
            sym("swap"),
            ParamList {
                required: vec![sym("a"), sym("b")],
                rest: None,
            },
            Expr::list(vec![Expr::atom("b"), Expr::atom("a")]),
        )
    }

    #[test]
    fn template_substitutes_parameters() {
        let out = swap_template()
            .instantiate(&[Expr::atom("1"), Expr::string("two")])
            .unwrap();
        assert_eq!(out.to_string(), "(\"two\" 1)");
    }

    #[test]
    fn template_checks_arity() {
        let err = swap_template().instantiate(&[Expr::atom("1")]).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::MacroExpansion);
        assert!(err.to_string().contains("exactly 2"));
    }

    #[test]
    fn rest_parameter_splices_into_lists() {
        let template = MacroTemplate::new(
            sym("all"),
            ParamList {
                required: vec![sym("first")],
                rest: Some(sym("more")),
            },
            Expr::list(vec![Expr::atom("and"), Expr::atom("first"), Expr::atom("...more")]),
        );
        let out = template
            .instantiate(&[Expr::atom("a"), Expr::atom("b"), Expr::atom("c")])
            .unwrap();
        assert_eq!(out.to_string(), "(and a b c)");
        let out = template.instantiate(&[Expr::atom("a")]).unwrap();
        assert_eq!(out.to_string(), "(and a)");
    }

    #[test]
    fn quoted_parts_are_left_alone() {
        let template = MacroTemplate::new(
            sym("q"),
            ParamList {
                required: vec![sym("x")],
                rest: None,
            },
            Expr::list(vec![
                Expr::atom("x"),
                Expr::list(vec![Expr::atom("quote"), Expr::atom("x")]),
            ]),
        );
        let out = template.instantiate(&[Expr::atom("1")]).unwrap();
        assert_eq!(out.to_string(), "(1 (quote x))");
    }

    #[test]
    fn clones_compare_equal_but_distinct_macros_do_not() {
        let a = FunctionMacro::new(|_| Ok(Expr::nil()));
        let b = FunctionMacro::new(|_| Ok(Expr::nil()));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
