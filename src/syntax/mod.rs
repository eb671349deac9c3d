//! Surface syntax: the character stream, the reader, and the datum grammar.

use serde::{Deserialize, Serialize};

pub mod parser;
pub mod reader;
pub mod stream;

pub use reader::{read_all, read_expression, skip_atmosphere};
pub use stream::CharStream;

/// Direction of case folding applied to atoms when case is not preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseFold {
    #[default]
    Lower,
    Upper,
}

/// How the reader canonicalizes atom text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadCase {
    /// Atom text is kept verbatim.
    Preserve,
    /// Atom text is folded.
    Fold(CaseFold),
}

impl ReadCase {
    pub fn apply(self, text: &str) -> String {
        match self {
            ReadCase::Preserve => text.to_string(),
            ReadCase::Fold(CaseFold::Lower) => text.to_lowercase(),
            ReadCase::Fold(CaseFold::Upper) => text.to_uppercase(),
        }
    }
}
