// Regression tests for the macropp binary.
// Requires: assert_cmd, predicates, tempfile crates in [dev-dependencies]

use std::fs;

use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};
use tempfile::TempDir;

fn macropp() -> Command {
    Command::cargo_bin("macropp").unwrap()
}

#[test]
fn process_reads_stdin_and_writes_stdout() {
    macropp()
        .arg("process")
        .write_stdin("#.(define-macro (double x) (x x))n = #:(double 3)\n")
        .assert()
        .success()
        .stdout("n = (3 3)\n");
}

#[test]
fn process_writes_to_an_output_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.txt");
    let output = dir.path().join("out.txt");
    fs::write(&input, "#.(define-symbol-macro pi 3.14159)pi = #c:(pi)\n").unwrap();

    macropp()
        .arg("process")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stdout("");
    assert_eq!(fs::read_to_string(&output).unwrap(), "pi = 3.14159\n");
}

#[test]
fn quiet_suppresses_output() {
    macropp()
        .args(["process", "--quiet"])
        .write_stdin("visible? #:(no)\n")
        .assert()
        .success()
        .stdout("");
}

#[test]
fn cli_reports_miette_diagnostics_on_error() {
    let dir = TempDir::new().unwrap();
    let bad_file = dir.path().join("bad.txt");
    fs::write(&bad_file, "text #:(define x 42\n" /* missing closing paren */).unwrap();

    macropp()
        .arg("process")
        .arg(&bad_file)
        .assert()
        .failure()
        .code(1)
        .stderr(contains("macropp::reader::malformed").or(contains("help:")));
}

#[test]
fn cyclic_definitions_fail_cleanly() {
    macropp()
        .arg("process")
        .write_stdin("#.(define-symbol-macro a b)#.(define-symbol-macro b a)#e:a")
        .assert()
        .failure()
        .code(1)
        .stderr(contains("macropp::host"));
}

#[test]
fn config_file_replaces_the_prefix_table() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("macropp.yaml");
    fs::write(
        &config,
        "case_fold: upper\nprefixes:\n  - { prefix: \"%%\", handler: print_expanded }\n",
    )
    .unwrap();

    macropp()
        .arg("process")
        .arg("--config")
        .arg(&config)
        .write_stdin("#:(kept) %%(shout)")
        .assert()
        .success()
        .stdout("#:(kept) (SHOUT)");

    macropp()
        .arg("prefixes")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(contains("%%").and(contains("print_expanded")));
}

#[test]
fn invalid_config_is_reported() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("bad.yaml");
    fs::write(&config, "prefixes: []\n").unwrap();

    macropp()
        .args(["prefixes", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(contains("macropp::config"));
}

#[test]
fn prefixes_lists_the_standard_table() {
    macropp()
        .arg("prefixes")
        .assert()
        .success()
        .stdout(
            contains("#.")
                .and(contains("evaluate_silently"))
                .and(contains("#c:"))
                .and(contains("render_expanded")),
        );
}

#[test]
fn expand_evaluates_definitions_and_prints_the_rest() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("forms.txt");
    fs::write(
        &file,
        "(define-macro (double x) (x x))\n(define-symbol-macro pi 3.14159)\n(double pi)\n; done\n(plain list)\n",
    )
    .unwrap();

    macropp()
        .arg("expand")
        .arg(&file)
        .assert()
        .success()
        .stdout("(3.14159 3.14159)\n(plain list)\n");

    macropp()
        .arg("expand")
        .arg("--trace")
        .arg(&file)
        .assert()
        .success()
        .stdout(contains("--- Step 0: pi (symbol) ---").and(contains("double (function)")));
}

#[test]
fn missing_input_file_fails() {
    macropp()
        .args(["process", "does/not/exist.txt"])
        .assert()
        .failure()
        .stderr(contains("cannot open"));
}
