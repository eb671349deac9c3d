//! Expression model for macropp
//!
//! Every directive reads one [`Expr`]: an atom, a string, or a list of expressions.
//! Expressions carry no source positions, so two expressions compare equal exactly when
//! they have the same shape and contents. Spans only appear in diagnostics.

use std::fmt;

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// A byte range in the text a stream has read so far.
///
/// # Examples
///
/// ```rust
/// use macropp::ast::Span;
/// let span = Span { start: 2, end: 7 };
/// assert_eq!(span.len(), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The canonical name of an atom.
///
/// Case handling happens once, in the reader; after that names compare exactly.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Symbol(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Symbol::new(name)
    }
}

impl From<String> for Symbol {
    fn from(name: String) -> Self {
        Symbol(name)
    }
}

/// The expression every directive reads, expands and renders.
///
/// # Examples
///
/// ```rust
/// use macropp::ast::Expr;
/// let call = Expr::list(vec![Expr::atom("double"), Expr::atom("3")]);
/// assert_eq!(call.to_string(), "(double 3)");
/// assert_eq!(call.macro_head().map(|s| s.as_str()), Some("double"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Atom(Symbol),
    Str(String),
    List(Vec<Expr>),
}

// ============================================================================
// CONSTRUCTORS AND CLASSIFICATION
// ============================================================================

impl Expr {
    pub fn atom(name: impl Into<Symbol>) -> Self {
        Expr::Atom(name.into())
    }

    pub fn string(text: impl Into<String>) -> Self {
        Expr::Str(text.into())
    }

    pub fn list(items: Vec<Expr>) -> Self {
        Expr::List(items)
    }

    /// The conventional empty value, the atom `nil`.
    pub fn nil() -> Self {
        Expr::atom("nil")
    }

    /// Returns the head atom of a list that could be a function-macro invocation.
    ///
    /// Only a non-empty list whose first element is an atom qualifies. Whether the head
    /// is actually registered is the registry's business.
    pub fn macro_head(&self) -> Option<&Symbol> {
        match self {
            Expr::List(items) => match items.first() {
                Some(Expr::Atom(head)) => Some(head),
                _ => None,
            },
            _ => None,
        }
    }

    /// The tail of a list (its arguments when used as a call).
    pub fn arguments(&self) -> &[Expr] {
        match self {
            Expr::List(items) if !items.is_empty() => &items[1..],
            _ => &[],
        }
    }

    pub fn as_atom(&self) -> Option<&Symbol> {
        match self {
            Expr::Atom(sym) => Some(sym),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Expr]> {
        match self {
            Expr::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_atom_named(&self, name: &str) -> bool {
        matches!(self, Expr::Atom(sym) if sym.as_str() == name)
    }

    /// A short description of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Expr::Atom(_) => "atom",
            Expr::Str(_) => "string",
            Expr::List(_) => "list",
        }
    }
}

// ============================================================================
// PRINTED FORM
// ============================================================================

/// Writes `text` as a double-quoted string literal, escaping `"` and `\`.
pub fn write_quoted(f: &mut impl fmt::Write, text: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in text.chars() {
        if c == '"' || c == '\\' {
            f.write_char('\\')?;
        }
        f.write_char(c)?;
    }
    f.write_char('"')
}

/// The printed form reads back as an equal expression.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Atom(sym) => write!(f, "{}", sym),
            Expr::Str(text) => write_quoted(f, text),
            Expr::List(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str(")")
            }
        }
    }
}
