//! Prefix dispatch.
//!
//! A [`PrefixTable`] is an ordered list of `(prefix, handler)` pairs. When the stream
//! driver reads a character, [`maybe_dispatch`] tries each prefix in order against that
//! character and the ones that follow it. A full match runs the handler; a mismatch
//! pushes back everything the attempt read, so the next candidate (or the verbatim
//! fallback) sees the input untouched.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::macros::{Expander, MacroRegistry};
use crate::output::OutputSink;
use crate::render::Renderer;
use crate::runtime::HostEvaluator;
use crate::syntax::{read_expression, CharStream, ReadCase};
use crate::{err_ctx, err_msg, PreprocessError};

// ============================================================================
// HANDLERS
// ============================================================================

/// State a handler may use or change while it runs.
pub struct DirectiveContext<'a> {
    pub registry: &'a mut MacroRegistry,
    pub host: &'a mut dyn HostEvaluator,
    pub settings: &'a Settings,
}

impl DirectiveContext<'_> {
    pub fn expander(&self) -> Expander<'_> {
        Expander::new(&*self.registry)
            .recursive(self.settings.recursive)
            .max_depth(self.settings.max_depth)
    }

    pub fn renderer(&self) -> Renderer<'_> {
        Renderer::new(&*self.registry)
            .recursive(self.settings.recursive)
            .max_depth(self.settings.max_depth)
    }
}

/// Something that runs after its prefix has been consumed.
pub trait Directive {
    fn handle(
        &self,
        cx: &mut DirectiveContext<'_>,
        input: &mut CharStream<'_>,
        output: &mut dyn OutputSink,
        prefix: &str,
    ) -> Result<(), PreprocessError>;

    /// Name shown when listing the prefix table.
    fn name(&self) -> &str {
        "custom"
    }
}

/// The built-in handlers. Each reads exactly one expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerKind {
    /// Print the expanded expression in printed form.
    PrintExpanded,
    /// Evaluate the expression for its side effects; print nothing.
    EvaluateSilently,
    /// Evaluate the expression and render the result.
    RenderEvaluated,
    /// Render the expanded expression.
    RenderExpanded,
}

impl HandlerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerKind::PrintExpanded => "print_expanded",
            HandlerKind::EvaluateSilently => "evaluate_silently",
            HandlerKind::RenderEvaluated => "render_evaluated",
            HandlerKind::RenderExpanded => "render_expanded",
        }
    }

    /// Evaluated and printed directives fold case; rendered ones preserve it.
    pub fn read_case(&self, settings: &Settings) -> ReadCase {
        match self {
            HandlerKind::PrintExpanded | HandlerKind::EvaluateSilently => {
                ReadCase::Fold(settings.case_fold)
            }
            HandlerKind::RenderEvaluated | HandlerKind::RenderExpanded => ReadCase::Preserve,
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Directive for HandlerKind {
    fn handle(
        &self,
        cx: &mut DirectiveContext<'_>,
        input: &mut CharStream<'_>,
        output: &mut dyn OutputSink,
        prefix: &str,
    ) -> Result<(), PreprocessError> {
        let expr = read_expression(input, self.read_case(cx.settings))?;
        tracing::debug!(prefix, handler = self.as_str(), %expr, "directive");
        match self {
            HandlerKind::PrintExpanded => {
                let expanded = cx.expander().expand(&expr)?;
                output.emit(&expanded.to_string())
            }
            HandlerKind::EvaluateSilently => {
                cx.host.evaluate(&expr, cx.registry)?;
                Ok(())
            }
            HandlerKind::RenderEvaluated => {
                let value = cx.host.evaluate(&expr, cx.registry)?;
                let text = cx.renderer().render_to_string(&value)?;
                output.emit(&text)
            }
            HandlerKind::RenderExpanded => {
                let expanded = cx.expander().expand(&expr)?;
                let text = cx.renderer().render_to_string(&expanded)?;
                output.emit(&text)
            }
        }
    }

    fn name(&self) -> &str {
        self.as_str()
    }
}

// ============================================================================
// PREFIX TABLE
// ============================================================================

#[derive(Clone)]
pub struct PrefixEntry {
    pub prefix: String,
    pub handler: Rc<dyn Directive>,
}

impl fmt::Debug for PrefixEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrefixEntry")
            .field("prefix", &self.prefix)
            .field("handler", &self.handler.name())
            .finish()
    }
}

/// Ordered `(prefix, handler)` pairs; the first full match wins.
#[derive(Debug, Clone, Default)]
pub struct PrefixTable {
    entries: Vec<PrefixEntry>,
}

impl PrefixTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// `#.` evaluate silently, `#:` print expanded, `#e:` render evaluated,
    /// `#c:` render expanded.
    pub fn standard() -> Self {
        let mut table = Self::new();
        for (prefix, kind) in STANDARD_PREFIXES {
            table.entries.push(PrefixEntry {
                prefix: prefix.to_string(),
                handler: Rc::new(*kind),
            });
        }
        table
    }

    /// Appends an entry. Prefixes must be non-empty.
    pub fn push(
        &mut self,
        prefix: impl Into<String>,
        handler: Rc<dyn Directive>,
    ) -> Result<(), PreprocessError> {
        let prefix = prefix.into();
        if prefix.is_empty() {
            return Err(err_msg!(Config, "prefixes must not be empty"));
        }
        if self.entries.iter().any(|e| e.prefix == prefix) {
            tracing::warn!(%prefix, "duplicate prefix; the earlier entry wins");
        }
        self.entries.push(PrefixEntry { prefix, handler });
        Ok(())
    }

    pub fn entries(&self) -> &[PrefixEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub const STANDARD_PREFIXES: &[(&str, HandlerKind)] = &[
    ("#.", HandlerKind::EvaluateSilently),
    ("#:", HandlerKind::PrintExpanded),
    ("#e:", HandlerKind::RenderEvaluated),
    ("#c:", HandlerKind::RenderExpanded),
];

// ============================================================================
// DISPATCH
// ============================================================================

/// Tries every prefix against `lookahead` and the characters after it.
///
/// Returns `Ok(true)` if a handler ran. On `Ok(false)` the stream is exactly as it was
/// after `lookahead` was read, and the caller owns the lookahead character. Running out
/// of input counts as a mismatch for that candidate; it is only an error when no later
/// candidate matches either.
pub fn maybe_dispatch(
    table: &PrefixTable,
    cx: &mut DirectiveContext<'_>,
    input: &mut CharStream<'_>,
    output: &mut dyn OutputSink,
    lookahead: char,
) -> Result<bool, PreprocessError> {
    let attempt_start = input.offset().saturating_sub(lookahead.len_utf8());
    let mut cut_short: Option<(&str, usize)> = None;
    'candidates: for entry in table.entries() {
        let mut expected = entry.prefix.chars();
        if expected.next() != Some(lookahead) {
            continue;
        }
        let mut consumed = Vec::new();
        for want in expected {
            let next = input.next_char()?;
            if let Some(c) = next {
                consumed.push(c);
            }
            if next != Some(want) {
                if next.is_none() && cut_short.is_none() {
                    cut_short = Some((entry.prefix.as_str(), input.offset()));
                }
                while let Some(c) = consumed.pop() {
                    input.unread(c);
                }
                continue 'candidates;
            }
        }
        entry.handler.handle(cx, input, output, &entry.prefix)?;
        return Ok(true);
    }
    match cut_short {
        Some((prefix, end)) => Err(err_ctx!(
            UnexpectedEof,
            format!("input ended while matching prefix '{}'", prefix),
            &input.named_source(),
            input.span(attempt_start, end)
        )),
        None => Ok(false),
    }
}
