//! Datum parser
//!
//! Converts the text of one delimited datum into an [`Expr`]. Atom case handling is
//! applied here, so everything downstream compares names exactly.

use pest::{iterators::Pair, Parser};
use pest_derive::Parser;

use crate::ast::{Expr, Symbol};
use crate::syntax::ReadCase;
use crate::{err_msg, PreprocessError};

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
struct DatumParser;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parses exactly one datum. Leading and trailing whitespace and comments are allowed.
pub fn parse_datum(text: &str, case: ReadCase) -> Result<Expr, PreprocessError> {
    let mut pairs = DatumParser::parse(Rule::datum, text).map_err(|e| {
        err_msg!(MalformedExpression, "could not parse '{}'", text.trim()).with_cause(e)
    })?;
    let datum = pairs
        .next()
        .ok_or_else(|| err_msg!(MalformedExpression, "empty datum"))?;
    let expr = datum
        .into_inner()
        .find(|p| p.as_rule() != Rule::EOI)
        .ok_or_else(|| err_msg!(MalformedExpression, "empty datum"))?;
    build_expr(expr, case)
}

// ============================================================================
// EXPRESSION BUILDERS
// ============================================================================

fn build_expr(pair: Pair<Rule>, case: ReadCase) -> Result<Expr, PreprocessError> {
    match pair.as_rule() {
        Rule::atom => Ok(Expr::Atom(Symbol::new(case.apply(pair.as_str())))),

        Rule::string => {
            let content = pair.into_inner().next().map(|p| p.as_str()).unwrap_or("");
            Ok(Expr::Str(unescape(content)))
        }

        Rule::list => {
            let items: Result<Vec<_>, _> =
                pair.into_inner().map(|p| build_expr(p, case)).collect();
            Ok(Expr::List(items?))
        }

        Rule::quoted => {
            let inner = pair
                .into_inner()
                .next()
                .ok_or_else(|| err_msg!(MalformedExpression, "quote without an expression"))?;
            Ok(Expr::list(vec![Expr::atom("quote"), build_expr(inner, case)?]))
        }

        rule => Err(err_msg!(
            MalformedExpression,
            "unsupported grammar rule: {:?}",
            rule
        )),
    }
}

// A backslash escapes the next character literally.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}
