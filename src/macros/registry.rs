//! Macro registry: storage, lookup and scoped overrides.
//!
//! # Macro Kinds
//! - **Function macros**: keyed by the head atom of a list, rewrite the list.
//! - **Symbol macros**: keyed by a bare atom, replace it with a stored expression.
//!
//! Installing a macro always overwrites; the previous binding is returned.
//!
//! # Scoped overrides
//!
//! [`MacroRegistry::with_scoped_function_macros`] and
//! [`MacroRegistry::with_scoped_symbol_macros`] install bindings for the duration of a
//! closure. The prior value of every affected name (or its absence) is recorded by a
//! guard that restores it when dropped, so the registry comes back unchanged whether the
//! body returns `Ok`, returns `Err`, or panics. Snapshots are undone in reverse order,
//! which makes nested scopes and repeated names within one scope restore correctly.
//!
//! # Summary Table
//! | Method                         | Overwrites | Restores on exit |
//! |--------------------------------|------------|------------------|
//! | define_function_macro          | Yes        | No               |
//! | define_symbol_macro            | Yes        | No               |
//! | with_scoped_function_macros    | Yes        | Yes              |
//! | with_scoped_symbol_macros      | Yes        | Yes              |
//! | remove_*                       | N/A        | No               |

use im::OrdMap;

use crate::ast::{Expr, Symbol};
use crate::macros::types::FunctionMacro;

/// Both macro tables. One registry lives for one preprocessing run.
///
/// Not thread-safe: function macros hold `Rc` transformers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MacroRegistry {
    function_macros: OrdMap<Symbol, FunctionMacro>,
    symbol_macros: OrdMap<Symbol, Expr>,
}

impl MacroRegistry {
    /// Creates an empty registry.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use macropp::macros::MacroRegistry;
    /// let registry = MacroRegistry::new();
    /// assert!(registry.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.function_macros.is_empty() && self.symbol_macros.is_empty()
    }

    // --- Function macros ---

    /// Installs a function macro, returning the binding it replaced.
    pub fn define_function_macro(
        &mut self,
        name: impl Into<Symbol>,
        func: FunctionMacro,
    ) -> Option<FunctionMacro> {
        self.function_macros.insert(name.into(), func)
    }

    pub fn lookup_function_macro(&self, name: &Symbol) -> Option<FunctionMacro> {
        self.function_macros.get(name).cloned()
    }

    pub fn remove_function_macro(&mut self, name: &Symbol) -> Option<FunctionMacro> {
        self.function_macros.remove(name)
    }

    /// Registered function macro names, in order.
    pub fn function_macro_names(&self) -> Vec<Symbol> {
        self.function_macros.keys().cloned().collect()
    }

    // --- Symbol macros ---

    /// Installs a symbol macro, returning the substitute it replaced.
    pub fn define_symbol_macro(&mut self, name: impl Into<Symbol>, substitute: Expr) -> Option<Expr> {
        self.symbol_macros.insert(name.into(), substitute)
    }

    pub fn lookup_symbol_macro(&self, name: &Symbol) -> Option<Expr> {
        self.symbol_macros.get(name).cloned()
    }

    pub fn remove_symbol_macro(&mut self, name: &Symbol) -> Option<Expr> {
        self.symbol_macros.remove(name)
    }

    /// Registered symbol macro names, in order.
    pub fn symbol_macro_names(&self) -> Vec<Symbol> {
        self.symbol_macros.keys().cloned().collect()
    }

    // --- Scoped overrides ---

    /// Runs `body` with `bindings` installed as function macros, then restores the
    /// previous bindings.
    pub fn with_scoped_function_macros<I, T, F>(&mut self, bindings: I, body: F) -> T
    where
        I: IntoIterator<Item = (Symbol, FunctionMacro)>,
        F: FnOnce(&mut MacroRegistry) -> T,
    {
        let mut guard = ScopeGuard::new(self, function_table);
        guard.install(bindings);
        body(guard.registry())
    }

    /// Runs `body` with `bindings` installed as symbol macros, then restores the previous
    /// bindings.
    pub fn with_scoped_symbol_macros<I, T, F>(&mut self, bindings: I, body: F) -> T
    where
        I: IntoIterator<Item = (Symbol, Expr)>,
        F: FnOnce(&mut MacroRegistry) -> T,
    {
        let mut guard = ScopeGuard::new(self, symbol_table);
        guard.install(bindings);
        body(guard.registry())
    }
}

fn function_table(registry: &mut MacroRegistry) -> &mut OrdMap<Symbol, FunctionMacro> {
    &mut registry.function_macros
}

fn symbol_table(registry: &mut MacroRegistry) -> &mut OrdMap<Symbol, Expr> {
    &mut registry.symbol_macros
}

// One guard type serves both tables; `table` selects which map it snapshots.
struct ScopeGuard<'r, V: Clone> {
    registry: &'r mut MacroRegistry,
    table: fn(&mut MacroRegistry) -> &mut OrdMap<Symbol, V>,
    saved: Vec<(Symbol, Option<V>)>,
}

impl<'r, V: Clone> ScopeGuard<'r, V> {
    fn new(
        registry: &'r mut MacroRegistry,
        table: fn(&mut MacroRegistry) -> &mut OrdMap<Symbol, V>,
    ) -> Self {
        Self {
            registry,
            table,
            saved: Vec::new(),
        }
    }

    fn install<I>(&mut self, bindings: I)
    where
        I: IntoIterator<Item = (Symbol, V)>,
    {
        for (name, value) in bindings {
            let prior = (self.table)(self.registry).insert(name.clone(), value);
            tracing::trace!(%name, shadowed = prior.is_some(), "scoped macro installed");
            self.saved.push((name, prior));
        }
    }

    fn registry(&mut self) -> &mut MacroRegistry {
        &mut *self.registry
    }
}

impl<V: Clone> Drop for ScopeGuard<'_, V> {
    fn drop(&mut self) {
        let table = (self.table)(self.registry);
        while let Some((name, prior)) = self.saved.pop() {
            match prior {
                Some(value) => {
                    table.insert(name, value);
                }
                None => {
                    table.remove(&name);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{catch_unwind, AssertUnwindSafe};

    use super::*;
    use crate::err_msg;
    use crate::PreprocessError;

    fn sym(name: &str) -> Symbol {
        Symbol::new(name)
    }

    fn constant(value: &str) -> FunctionMacro {
        let value = Expr::atom(value);
        FunctionMacro::new(move |_| Ok(value.clone()))
    }

    #[test]
    fn last_writer_wins() {
        let mut reg = MacroRegistry::new();
        assert!(reg.define_symbol_macro("pi", Expr::atom("3")).is_none());
        let old = reg.define_symbol_macro("pi", Expr::atom("3.14159"));
        assert_eq!(old, Some(Expr::atom("3")));
        assert_eq!(reg.lookup_symbol_macro(&sym("pi")), Some(Expr::atom("3.14159")));
    }

    #[test]
    fn namespaces_are_separate() {
        let mut reg = MacroRegistry::new();
        reg.define_function_macro("x", constant("f"));
        assert!(reg.lookup_symbol_macro(&sym("x")).is_none());
        assert!(reg.lookup_function_macro(&sym("x")).is_some());
        assert_eq!(reg.function_macro_names(), vec![sym("x")]);
        assert!(reg.symbol_macro_names().is_empty());
    }

    #[test]
    fn scoped_symbol_macros_restore_on_return() {
        let mut reg = MacroRegistry::new();
        reg.define_symbol_macro("a", Expr::atom("outer"));
        let before = reg.clone();

        let seen = reg.with_scoped_symbol_macros(
            vec![(sym("a"), Expr::atom("inner")), (sym("b"), Expr::atom("new"))],
            |r| (r.lookup_symbol_macro(&sym("a")), r.lookup_symbol_macro(&sym("b"))),
        );

        assert_eq!(seen, (Some(Expr::atom("inner")), Some(Expr::atom("new"))));
        assert_eq!(reg, before);
        assert!(reg.lookup_symbol_macro(&sym("b")).is_none());
    }

    #[test]
    fn scoped_function_macros_restore_on_error() {
        let mut reg = MacroRegistry::new();
        let outer = constant("outer");
        reg.define_function_macro("f", outer.clone());
        let before = reg.clone();

        let result: Result<(), PreprocessError> =
            reg.with_scoped_function_macros(vec![(sym("f"), constant("inner"))], |_| {
                Err(err_msg!(HostEvaluation, "body failed"))
            });

        assert!(result.is_err());
        assert_eq!(reg, before);
        assert_eq!(reg.lookup_function_macro(&sym("f")), Some(outer));
    }

    #[test]
    fn scoped_bindings_restore_on_panic() {
        let mut reg = MacroRegistry::new();
        let before = reg.clone();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            reg.with_scoped_symbol_macros(vec![(sym("x"), Expr::atom("1"))], |_| {
                panic!("body panicked")
            })
        }));
        assert!(outcome.is_err());
        assert_eq!(reg, before);
    }

    #[test]
    fn repeated_names_restore_to_value_before_scope() {
        let mut reg = MacroRegistry::new();
        reg.define_symbol_macro("x", Expr::atom("0"));
        reg.with_scoped_symbol_macros(
            vec![(sym("x"), Expr::atom("1")), (sym("x"), Expr::atom("2"))],
            |r| assert_eq!(r.lookup_symbol_macro(&sym("x")), Some(Expr::atom("2"))),
        );
        assert_eq!(reg.lookup_symbol_macro(&sym("x")), Some(Expr::atom("0")));
    }

    #[test]
    fn nested_scopes_unwind_in_stack_order() {
        let mut reg = MacroRegistry::new();
        reg.with_scoped_symbol_macros(vec![(sym("x"), Expr::atom("1"))], |r| {
            r.with_scoped_symbol_macros(vec![(sym("x"), Expr::atom("2"))], |r| {
                assert_eq!(r.lookup_symbol_macro(&sym("x")), Some(Expr::atom("2")));
            });
            assert_eq!(r.lookup_symbol_macro(&sym("x")), Some(Expr::atom("1")));
        });
        assert!(reg.is_empty());
    }

    #[test]
    fn definitions_inside_a_scope_outlive_it() {
        let mut reg = MacroRegistry::new();
        reg.with_scoped_symbol_macros(vec![(sym("x"), Expr::atom("1"))], |r| {
            r.define_symbol_macro("y", Expr::atom("global"));
        });
        assert!(reg.lookup_symbol_macro(&sym("x")).is_none());
        assert_eq!(reg.lookup_symbol_macro(&sym("y")), Some(Expr::atom("global")));
    }
}
