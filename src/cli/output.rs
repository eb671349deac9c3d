//! Handles all user-facing output for the CLI.
//!
//! This module is responsible for colorizing expansion traces and formatting errors,
//! so every command reports the same way.

use std::io;

use difference::{Changeset, Difference};
use miette::Report;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::macros::{ExpansionStep, MacroKind};
use crate::PreprocessError;

// ============================================================================
// CORE OUTPUT FUNCTIONS: User-facing CLI output utilities
// ============================================================================

/// Prints a macro expansion trace to stdout with colored diffs.
pub fn print_trace(trace: &[ExpansionStep]) -> io::Result<()> {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    write_trace(&mut stdout, trace)
}

/// Writes one block per step: a header, then a word diff from the step's input to its
/// output.
pub fn write_trace(out: &mut impl WriteColor, trace: &[ExpansionStep]) -> io::Result<()> {
    for (i, step) in trace.iter().enumerate() {
        let kind = match step.kind {
            MacroKind::Function => "function",
            MacroKind::Symbol => "symbol",
        };
        out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true))?;
        writeln!(out, "--- Step {}: {} ({}) ---", i, step.macro_name, kind)?;
        out.reset()?;

        let before = step.input.to_string();
        let after = step.output.to_string();
        let changeset = Changeset::new(&before, &after, " ");
        write_diff(out, &changeset.diffs)?;
        writeln!(out)?;
    }
    Ok(())
}

/// Renders an error as a miette report on stderr.
pub fn print_error(error: PreprocessError) {
    eprintln!("{:?}", Report::new(error));
}

// ============================================================================
// PRIVATE HELPERS
// ============================================================================

fn write_diff(out: &mut impl WriteColor, diffs: &[Difference]) -> io::Result<()> {
    for diff in diffs {
        match diff {
            Difference::Same(ref x) => {
                out.reset()?;
                writeln!(out, " {}", x)?;
            }
            Difference::Add(ref x) => {
                out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
                writeln!(out, "+{}", x)?;
            }
            Difference::Rem(ref x) => {
                out.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
                writeln!(out, "-{}", x)?;
            }
        }
    }
    out.reset()
}
