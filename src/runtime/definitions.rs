//! The definition evaluator.
//!
//! A small host: enough to define macros from inside a document and to
//! build data for rendering. It is not a general-purpose language.
//!
//! | Form | Result |
//! |------|--------|
//! | `"text"`, unbound atom | itself |
//! | symbol-macro atom | its substitute, evaluated |
//! | `(quote x)` | `x` |
//! | `(progn f...)` | last value, `nil` when empty |
//! | `(list f...)` | list of the values |
//! | `(define-symbol-macro name expr)` | installs `expr`, returns `name` |
//! | `(define-macro (name p... ...rest) body)` | installs a template macro, returns `name` |
//! | `(symbol-macrolet ((name expr)...) f...)` | `f...` with scoped symbol macros |
//! | `(macrolet ((name (p...) body)...) f...)` | `f...` with scoped function macros |
//! | `(macroexpand f)` | expansion of the value of `f` |
//! | `(m args...)` with `m` a function macro | the expansion, evaluated |
//!
//! The forms above take precedence over function macros with the same name.

use std::collections::HashSet;

use crate::ast::{Expr, Symbol};
use crate::config::Settings;
use crate::macros::{Expander, FunctionMacro, MacroRegistry, MacroTemplate, ParamList};
use crate::runtime::HostEvaluator;
use crate::{err_msg, PreprocessError};

#[derive(Debug, Clone)]
pub struct DefinitionEvaluator {
    settings: Settings,
}

impl Default for DefinitionEvaluator {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl HostEvaluator for DefinitionEvaluator {
    fn evaluate(&mut self, expr: &Expr, registry: &mut MacroRegistry) -> Result<Expr, PreprocessError> {
        self.eval(expr, registry, 0)
    }
}

impl DefinitionEvaluator {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    fn eval(&mut self, expr: &Expr, registry: &mut MacroRegistry, depth: usize) -> Result<Expr, PreprocessError> {
        if depth > self.settings.max_depth {
            return Err(err_msg!(
                HostEvaluation,
                "evaluation of '{}' exceeded the depth limit of {}",
                expr,
                self.settings.max_depth
            ));
        }
        let items = match expr {
            Expr::Str(_) => return Ok(expr.clone()),
            Expr::Atom(sym) => {
                return match registry.lookup_symbol_macro(sym) {
                    Some(substitute) => self.eval(&substitute, registry, depth + 1),
                    None => Ok(expr.clone()),
                }
            }
            Expr::List(items) if items.is_empty() => return Ok(expr.clone()),
            Expr::List(items) => items,
        };
        let Some(head) = expr.macro_head() else {
            return Err(err_msg!(
                HostEvaluation,
                "cannot evaluate '{}': a form must start with an atom, not a {}",
                expr,
                items[0].type_name()
            ));
        };
        let args = &items[1..];

        match head.as_str() {
            "quote" => {
                let [quoted] = expect_args::<1>(head, args)?;
                Ok(quoted.clone())
            }
            "progn" => self.eval_body(args, registry, depth),
            "list" => args
                .iter()
                .map(|arg| self.eval(arg, registry, depth + 1))
                .collect::<Result<Vec<_>, _>>()
                .map(Expr::List),
            "define-symbol-macro" => {
                let [name, substitute] = expect_args::<2>(head, args)?;
                let name = expect_atom(head, name)?;
                tracing::debug!(%name, %substitute, "symbol macro defined");
                registry.define_symbol_macro(name.clone(), substitute.clone());
                Ok(Expr::Atom(name.clone()))
            }
            "define-macro" => define_macro(head, args, registry),
            "symbol-macrolet" => {
                let (bindings, body) = split_bindings(head, args)?;
                let bindings = symbol_bindings(head, bindings)?;
                registry.with_scoped_symbol_macros(bindings, |r| self.eval_body(body, r, depth))
            }
            "macrolet" => {
                let (bindings, body) = split_bindings(head, args)?;
                let bindings = function_bindings(head, bindings)?;
                registry.with_scoped_function_macros(bindings, |r| self.eval_body(body, r, depth))
            }
            "macroexpand" => {
                let [form] = expect_args::<1>(head, args)?;
                let form = self.eval(form, registry, depth + 1)?;
                self.expander(registry).expand(&form)
            }
            _ => {
                if registry.lookup_function_macro(head).is_none() {
                    return Err(err_msg!(HostEvaluation, "no operator named '{}'", head)
                        .with_help("define it with (define-macro (name params...) body)"));
                }
                let expanded = self.expander(registry).expand(expr)?;
                self.eval(&expanded, registry, depth + 1)
            }
        }
    }

    fn eval_body(&mut self, forms: &[Expr], registry: &mut MacroRegistry, depth: usize) -> Result<Expr, PreprocessError> {
        let mut last = Expr::nil();
        for form in forms {
            last = self.eval(form, registry, depth + 1)?;
        }
        Ok(last)
    }

    fn expander<'r>(&self, registry: &'r MacroRegistry) -> Expander<'r> {
        Expander::new(registry)
            .recursive(self.settings.recursive)
            .max_depth(self.settings.max_depth)
    }
}

// ============================================================================
// FORM HELPERS
// ============================================================================

// Kept out of `eval` so its recursive frame stays small.
fn define_macro(head: &Symbol, args: &[Expr], registry: &mut MacroRegistry) -> Result<Expr, PreprocessError> {
    let [signature, body] = expect_args::<2>(head, args)?;
    let Some((name, params)) = signature.as_list().and_then(|s| s.split_first()) else {
        return Err(err_msg!(
            HostEvaluation,
            "{} expects a signature list like (name params...), got '{}'",
            head,
            signature
        ));
    };
    let name = expect_atom(head, name)?;
    let template = MacroTemplate::new(name.clone(), parse_params(name, params)?, body.clone());
    tracing::debug!(%template, "function macro defined");
    registry.define_function_macro(name.clone(), FunctionMacro::from_template(template));
    Ok(Expr::Atom(name.clone()))
}

fn symbol_bindings(head: &Symbol, bindings: &[Expr]) -> Result<Vec<(Symbol, Expr)>, PreprocessError> {
    bindings
        .iter()
        .map(|binding| -> Result<_, PreprocessError> {
            let [name, substitute] = expect_args::<2>(head, binding_items(head, binding)?)?;
            Ok((expect_atom(head, name)?.clone(), substitute.clone()))
        })
        .collect()
}

fn function_bindings(head: &Symbol, bindings: &[Expr]) -> Result<Vec<(Symbol, FunctionMacro)>, PreprocessError> {
    bindings
        .iter()
        .map(|binding| -> Result<_, PreprocessError> {
            let [name, params, template_body] = expect_args::<3>(head, binding_items(head, binding)?)?;
            let name = expect_atom(head, name)?;
            let params = params.as_list().ok_or_else(|| {
                err_msg!(HostEvaluation, "{}: parameters of '{}' must be a list", head, name)
            })?;
            let template = MacroTemplate::new(name.clone(), parse_params(name, params)?, template_body.clone());
            Ok((name.clone(), FunctionMacro::from_template(template)))
        })
        .collect()
}

fn expect_args<'e, const N: usize>(head: &Symbol, args: &'e [Expr]) -> Result<&'e [Expr; N], PreprocessError> {
    args.try_into().map_err(|_| {
        err_msg!(
            HostEvaluation,
            "{} expects {} argument(s), got {}",
            head,
            N,
            args.len()
        )
    })
}

fn expect_atom<'e>(head: &Symbol, expr: &'e Expr) -> Result<&'e Symbol, PreprocessError> {
    expr.as_atom().ok_or_else(|| {
        err_msg!(
            HostEvaluation,
            "{} expects a name, got {} '{}'",
            head,
            expr.type_name(),
            expr
        )
    })
}

// `(form (bindings...) body...)` -> (bindings, body)
fn split_bindings<'e>(head: &Symbol, args: &'e [Expr]) -> Result<(&'e [Expr], &'e [Expr]), PreprocessError> {
    match args.split_first() {
        Some((Expr::List(bindings), body)) => Ok((bindings, body)),
        _ => Err(err_msg!(
            HostEvaluation,
            "{} expects a list of bindings followed by body forms",
            head
        )),
    }
}

fn binding_items<'e>(head: &Symbol, binding: &'e Expr) -> Result<&'e [Expr], PreprocessError> {
    binding.as_list().ok_or_else(|| {
        err_msg!(HostEvaluation, "{}: each binding must be a list, got '{}'", head, binding)
    })
}

/// Parses `(p1 p2 ...rest)`. A rest parameter must come last; names must be unique.
fn parse_params(name: &Symbol, params: &[Expr]) -> Result<ParamList, PreprocessError> {
    let mut list = ParamList::default();
    let mut seen = HashSet::new();
    for (i, param) in params.iter().enumerate() {
        let Some(sym) = param.as_atom() else {
            return Err(err_msg!(
                HostEvaluation,
                "macro '{}': parameter '{}' is not a name",
                name,
                param
            ));
        };
        let (param_name, is_rest) = match sym.as_str().strip_prefix("...") {
            Some(rest) => (rest, true),
            None => (sym.as_str(), false),
        };
        if param_name.is_empty() {
            return Err(err_msg!(HostEvaluation, "macro '{}': rest parameter needs a name", name));
        }
        if !seen.insert(param_name.to_string()) {
            return Err(err_msg!(
                HostEvaluation,
                "macro '{}': duplicate parameter '{}'",
                name,
                param_name
            ));
        }
        if is_rest {
            if i + 1 != params.len() {
                return Err(err_msg!(
                    HostEvaluation,
                    "macro '{}': rest parameter '{}' must come last",
                    name,
                    sym
                ));
            }
            list.rest = Some(Symbol::new(param_name));
        } else {
            list.required.push(sym.clone());
        }
    }
    Ok(list)
}
