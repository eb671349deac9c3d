//! Renderer: turns an expression into output text.
//!
//! Rendering does its own macro handling instead of requiring an expanded tree:
//!
//! - an atom bound as a symbol macro renders its substitute, recursively;
//! - a function-macro call has its arguments expanded (exactly as the
//!   [`Expander`] would) and handed to the transformer, and the result is rendered;
//! - strings render in printed form, quoted and escaped;
//! - any other list renders its elements separated by single spaces, without
//!   parentheses, so nested lists flatten;
//! - any other atom renders as its name.

use crate::ast::Expr;
use crate::macros::{Expander, MacroRegistry, DEFAULT_MAX_DEPTH};
use crate::{err_msg, PreprocessError};

pub struct Renderer<'r> {
    registry: &'r MacroRegistry,
    recursive: bool,
    max_depth: usize,
}

impl<'r> Renderer<'r> {
    pub fn new(registry: &'r MacroRegistry) -> Self {
        Self {
            registry,
            recursive: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Expansion mode used for function-macro arguments.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn render_to_string(&self, expr: &Expr) -> Result<String, PreprocessError> {
        let mut out = String::new();
        self.render(&mut out, expr)?;
        Ok(out)
    }

    /// Appends the rendering of `expr` to `out`.
    pub fn render(&self, out: &mut String, expr: &Expr) -> Result<(), PreprocessError> {
        self.render_at(out, expr, 0)
    }

    fn render_at(&self, out: &mut String, expr: &Expr, depth: usize) -> Result<(), PreprocessError> {
        if depth > self.max_depth {
            return Err(err_msg!(
                MacroExpansion,
                "rendering '{}' exceeded the depth limit of {}",
                expr,
                self.max_depth
            ));
        }
        match expr {
            Expr::Atom(sym) => match self.registry.lookup_symbol_macro(sym) {
                Some(substitute) => self.render_at(out, &substitute, depth + 1),
                None => {
                    out.push_str(sym.as_str());
                    Ok(())
                }
            },
            Expr::Str(_) => {
                out.push_str(&expr.to_string());
                Ok(())
            }
            Expr::List(items) => {
                if let Some(mac) = expr
                    .macro_head()
                    .and_then(|head| self.registry.lookup_function_macro(head))
                {
                    let args = Expander::new(self.registry)
                        .recursive(self.recursive)
                        .max_depth(self.max_depth)
                        .expand_all(expr.arguments())?;
                    let produced = mac.call(&args)?;
                    return self.render_at(out, &produced, depth + 1);
                }
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    self.render_at(out, item, depth)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorType;
    use crate::macros::FunctionMacro;

    fn render(reg: &MacroRegistry, expr: &Expr) -> String {
        Renderer::new(reg).render_to_string(expr).unwrap()
    }

    #[test]
    fn plain_lists_render_space_separated_and_flattened() {
        let reg = MacroRegistry::new();
        let expr = Expr::list(vec![
            Expr::atom("a"),
            Expr::list(vec![Expr::atom("b"), Expr::string("c d")]),
        ]);
        assert_eq!(render(&reg, &expr), "a b \"c d\"");
    }

    #[test]
    fn symbol_macros_render_their_substitute_recursively() {
        let mut reg = MacroRegistry::new();
        reg.define_symbol_macro("greeting", Expr::list(vec![Expr::atom("hello"), Expr::atom("name")]));
        reg.define_symbol_macro("name", Expr::atom("world"));
        assert_eq!(render(&reg, &Expr::atom("greeting")), "hello world");
    }

    #[test]
    fn function_macros_receive_the_call_arguments() {
        let mut reg = MacroRegistry::new();
        reg.define_symbol_macro("pi", Expr::atom("3.14159"));
        reg.define_function_macro(
            "twice",
            FunctionMacro::new(|args| Ok(Expr::list([args, args].concat()))),
        );
        let expr = Expr::list(vec![Expr::atom("twice"), Expr::atom("pi"), Expr::atom("x")]);
        assert_eq!(render(&reg, &expr), "3.14159 x 3.14159 x");
    }

    #[test]
    fn macro_output_is_rendered_with_macros_applied() {
        let mut reg = MacroRegistry::new();
        reg.define_symbol_macro("who", Expr::string("me"));
        reg.define_function_macro(
            "ask",
            FunctionMacro::new(|_| Ok(Expr::list(vec![Expr::atom("ask"), Expr::atom("who")]))),
        );
        // `ask` in head position of its own output recurses until the depth limit.
        let err = Renderer::new(&reg)
            .max_depth(8)
            .render_to_string(&Expr::list(vec![Expr::atom("ask")]))
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::MacroExpansion);

        reg.define_function_macro(
            "ask",
            FunctionMacro::new(|_| Ok(Expr::list(vec![Expr::atom("who"), Expr::atom("?")]))),
        );
        assert_eq!(render(&reg, &Expr::list(vec![Expr::atom("ask")])), "\"me\" ?");
    }

    #[test]
    fn self_referencing_symbol_macro_stops_at_the_default_limit() {
        let mut reg = MacroRegistry::new();
        reg.define_symbol_macro("a", Expr::list(vec![Expr::atom("x"), Expr::atom("a")]));
        let err = Renderer::new(&reg).render_to_string(&Expr::atom("a")).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::MacroExpansion);
        assert!(err.to_string().contains("depth limit"));
    }

    #[test]
    fn empty_list_renders_as_nothing() {
        let reg = MacroRegistry::new();
        assert_eq!(render(&reg, &Expr::list(vec![])), "");
    }
}
