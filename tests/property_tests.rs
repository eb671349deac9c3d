//! Property-based tests for the expression model and the expander.

use proptest::prelude::*;

use macropp::ast::Expr;
use macropp::macros::{expand, FunctionMacro, MacroRegistry};
use macropp::syntax::parser::parse_datum;
use macropp::syntax::ReadCase;
use macropp::Preprocessor;

fn arb_expr() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![
        "[a-z][a-z0-9+*/<>=!?-]{0,6}".prop_map(|name| Expr::atom(name)),
        "[a-zA-Z0-9 ()\"\\\\;']{0,8}".prop_map(|text| Expr::string(text)),
    ];
    leaf.prop_recursive(4, 32, 5, |inner| {
        prop::collection::vec(inner, 0..5).prop_map(Expr::list)
    })
}

// Macro names no generated atom can spell.
fn unreachable_registry() -> MacroRegistry {
    let mut registry = MacroRegistry::new();
    registry.define_function_macro("Twice", FunctionMacro::new(|args| Ok(Expr::list(args.to_vec()))));
    registry.define_symbol_macro("PI", Expr::atom("3.14159"));
    registry
}

proptest! {
    #[test]
    fn expansion_without_macros_is_identity(expr in arb_expr()) {
        prop_assert_eq!(expand(&expr, &MacroRegistry::new(), false).unwrap(), expr.clone());
        prop_assert_eq!(expand(&expr, &unreachable_registry(), false).unwrap(), expr.clone());
        prop_assert_eq!(expand(&expr, &unreachable_registry(), true).unwrap(), expr);
    }

    #[test]
    fn printed_form_reads_back(expr in arb_expr()) {
        let printed = expr.to_string();
        prop_assert_eq!(parse_datum(&printed, ReadCase::Preserve).unwrap(), expr);
    }

    #[test]
    fn text_without_prefix_characters_passes_through(text in "[^#]{0,64}") {
        let mut pp = Preprocessor::default();
        prop_assert_eq!(pp.process_str(&text).unwrap(), text);
    }
}
