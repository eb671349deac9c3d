//! Configuration.
//!
//! A run is configured by a YAML document. Every field is optional:
//!
//! ```yaml
//! recursive: false
//! case_fold: lower
//! max_expansion_depth: 128
//! prefixes:
//!   - { prefix: "#.", handler: evaluate_silently }
//!   - { prefix: "#:", handler: print_expanded }
//! ```

use std::fs;
use std::path::Path;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::ast::Span;
use crate::diagnostics::to_error_source;
use crate::dispatch::{HandlerKind, PrefixTable, STANDARD_PREFIXES};
use crate::macros::DEFAULT_MAX_DEPTH;
use crate::syntax::CaseFold;
use crate::{err_ctx, err_msg, PreprocessError};

/// Mode switches shared by every directive of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub recursive: bool,
    pub case_fold: CaseFold,
    pub max_depth: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            recursive: false,
            case_fold: CaseFold::Lower,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrefixSpec {
    pub prefix: String,
    pub handler: HandlerKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub recursive: bool,
    pub case_fold: CaseFold,
    pub max_expansion_depth: usize,
    pub prefixes: Vec<PrefixSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            recursive: false,
            case_fold: CaseFold::default(),
            max_expansion_depth: DEFAULT_MAX_DEPTH,
            prefixes: STANDARD_PREFIXES
                .iter()
                .map(|(prefix, handler)| PrefixSpec {
                    prefix: prefix.to_string(),
                    handler: *handler,
                })
                .collect(),
        }
    }
}

impl Config {
    /// Parses and validates a configuration. `name` labels the source in diagnostics.
    pub fn from_yaml_str(text: &str, name: &str) -> Result<Self, PreprocessError> {
        let config: Config = match serde_yaml::from_str(text) {
            Ok(config) => config,
            // An empty document means "all defaults".
            Err(_) if text.trim().is_empty() => Config::default(),
            Err(e) => {
                let message = format!("invalid configuration: {}", e);
                let err = match e.location() {
                    Some(loc) => {
                        let at = loc.index().min(text.len());
                        err_ctx!(
                            Config,
                            message,
                            &to_error_source(name, text),
                            Span::new(at, (at + 1).min(text.len()))
                        )
                    }
                    None => err_msg!(Config, "{}", message),
                };
                return Err(err.with_cause(e));
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, PreprocessError> {
        let text = fs::read_to_string(path).map_err(|e| {
            err_msg!(Io, "cannot read configuration '{}'", path.display()).with_cause(e)
        })?;
        Self::from_yaml_str(&text, &path.display().to_string())
    }

    pub fn validate(&self) -> Result<(), PreprocessError> {
        if self.prefixes.is_empty() {
            return Err(err_msg!(Config, "the prefix table is empty")
                .with_help("list at least one entry under 'prefixes'"));
        }
        if self.max_expansion_depth == 0 {
            return Err(err_msg!(Config, "max_expansion_depth must be at least 1"));
        }
        if let Some(i) = self.prefixes.iter().position(|p| p.prefix.is_empty()) {
            return Err(err_msg!(Config, "prefix #{} is empty", i + 1));
        }
        Ok(())
    }

    pub fn settings(&self) -> Settings {
        Settings {
            recursive: self.recursive,
            case_fold: self.case_fold,
            max_depth: self.max_expansion_depth,
        }
    }

    pub fn prefix_table(&self) -> Result<PrefixTable, PreprocessError> {
        let mut table = PrefixTable::new();
        for spec in &self.prefixes {
            table.push(spec.prefix.clone(), Rc::new(spec.handler))?;
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorType;

    #[test]
    fn empty_document_is_the_default() {
        let config = Config::from_yaml_str("", "empty.yaml").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.settings(), Settings::default());
        assert_eq!(config.prefix_table().unwrap().entries().len(), 4);
    }

    #[test]
    fn partial_documents_keep_defaults() {
        let config = Config::from_yaml_str("recursive: true\ncase_fold: upper\n", "c.yaml").unwrap();
        assert!(config.recursive);
        assert_eq!(config.case_fold, CaseFold::Upper);
        assert_eq!(config.max_expansion_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(config.prefixes, Config::default().prefixes);
    }

    #[test]
    fn prefixes_keep_their_order() {
        let text = "prefixes:\n  - { prefix: \"@@\", handler: render_expanded }\n  - { prefix: \"@\", handler: print_expanded }\n";
        let table = Config::from_yaml_str(text, "c.yaml").unwrap().prefix_table().unwrap();
        let listed: Vec<_> = table
            .entries()
            .iter()
            .map(|e| (e.prefix.as_str(), e.handler.name().to_string()))
            .collect();
        assert_eq!(
            listed,
            vec![("@@", "render_expanded".to_string()), ("@", "print_expanded".to_string())]
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = Config::from_yaml_str("recursve: true\n", "typo.yaml").unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
        assert!(err.to_string().contains("recursve"));
    }

    #[test]
    fn unknown_handlers_are_rejected() {
        let err = Config::from_yaml_str("prefixes:\n  - { prefix: \"#\", handler: shout }\n", "c.yaml")
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
    }

    #[test]
    fn invalid_tables_are_rejected() {
        for text in ["prefixes: []\n", "max_expansion_depth: 0\n", "prefixes:\n  - { prefix: \"\", handler: print_expanded }\n"] {
            let err = Config::from_yaml_str(text, "c.yaml").unwrap_err();
            assert_eq!(err.error_type(), ErrorType::Config, "{}", text);
        }
    }

    #[test]
    fn duplicate_prefixes_are_accepted() {
        let text = "prefixes:\n  - { prefix: \"#\", handler: print_expanded }\n  - { prefix: \"#\", handler: render_expanded }\n";
        let table = Config::from_yaml_str(text, "c.yaml").unwrap().prefix_table().unwrap();
        assert_eq!(table.entries().len(), 2);
    }
}
