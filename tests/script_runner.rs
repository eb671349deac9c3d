// macropp Integration Test Runner
// Discovers all .txt files in tests/scripts/, preprocesses them, and compares output to
// .expected files. An expected file reading `error: <ErrorType>` expects that failure.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use walkdir::WalkDir;

use macropp::Preprocessor;

fn find_test_scripts(dir: &str) -> Vec<(PathBuf, PathBuf)> {
    let mut tests = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        let path = entry.path();
        if path.is_file() && path.extension().map(|e| e == "txt").unwrap_or(false) {
            let expected = path.with_extension("expected");
            if expected.exists() {
                tests.push((path.to_path_buf(), expected));
            }
        }
    }
    tests
}

fn read_normalized(path: &Path) -> io::Result<String> {
    Ok(fs::read_to_string(path)?.replace("\r\n", "\n"))
}

#[test]
fn integration_scripts() {
    let scripts = find_test_scripts("tests/scripts");
    assert!(!scripts.is_empty(), "No .txt test scripts found in tests/scripts/");

    let mut failed = false;
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);

    for (script, expected) in scripts {
        let script_name = script.file_name().unwrap().to_string_lossy().to_string();
        let input = read_normalized(&script).expect("Failed to read script");
        let expected_output = read_normalized(&expected).expect("Failed to read expected output");

        let mut preprocessor = Preprocessor::default();
        let actual_output = match preprocessor.process_str(&input) {
            Ok(out) => out,
            Err(e) => format!("error: {}\n", e.error_type()),
        };

        if actual_output == expected_output {
            let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true));
            let _ = writeln!(stdout, "PASS: {script_name}");
        } else {
            failed = true;
            let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true));
            let _ = writeln!(stdout, "FAIL: {script_name}");
            let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(false));
            let _ = writeln!(stdout, "  Expected: {expected_output:?}");
            let _ = writeln!(stdout, "  Actual:   {actual_output:?}");
        }
        let _ = stdout.reset();
    }

    if failed {
        panic!("One or more integration scripts failed. See output above.");
    }
}
