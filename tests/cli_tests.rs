//! CLI End-to-End Tests
//!
//! Drive the rigger binary against real recipe files in temporary
//! sandboxes: flag handling, exit codes, and the documented end-to-end
//! scenarios (notify cascades, includes, check failures).

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn rigger_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_rigger"))
}

fn write_recipe(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("failed to write recipe");
    path
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::new(rigger_bin());
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("host-automation"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::new(rigger_bin());
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("rigger"));
}

#[test]
fn test_cli_requires_a_file() {
    let mut cmd = Command::new(rigger_bin());
    cmd.assert().failure();
}

// A single shell rule runs and the process exits 0.
#[test]
fn test_simple_shell_rule() {
    let temp = TempDir::new().unwrap();
    let recipe = write_recipe(temp.path(), "main.in", "shell { command => \"true\" }\n");

    let mut cmd = Command::new(rigger_bin());
    cmd.arg(&recipe);
    cmd.assert().success();
}

// A changed directory rule notifies a triggered shell rule; the second run
// changes nothing, so the triggered rule stays dormant.
#[test]
fn test_notify_cascade_and_second_run() {
    let temp = TempDir::new().unwrap();
    let made = temp.path().join("made");
    let marker = temp.path().join("marker");
    let recipe = write_recipe(
        temp.path(),
        "main.in",
        &format!(
            "directory {{ name => \"A\", target => \"{}\", notify => \"B\" }}\n\
             shell triggered {{ name => \"B\", command => \"touch {}\" }}\n",
            made.display(),
            marker.display()
        ),
    );

    Command::new(rigger_bin()).arg(&recipe).assert().success();
    assert!(made.is_dir());
    assert!(marker.exists());

    std::fs::remove_file(&marker).unwrap();
    Command::new(rigger_bin()).arg(&recipe).assert().success();
    assert!(!marker.exists(), "second run must not re-notify");
}

// Backtick assignment feeds command output into a parameter.
#[test]
fn test_backtick_assignment_interpolates() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("out");
    let recipe = write_recipe(
        temp.path(),
        "main.in",
        &format!(
            "let word = `echo captured`\n\
             file {{ name => \"w\", target => \"{}\", content => \"${{word}}\" }}\n",
            out.display()
        ),
    );

    Command::new(rigger_bin()).arg(&recipe).assert().success();
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "captured");
}

// Duplicate rule names fail the check pass before anything executes.
#[test]
fn test_duplicate_names_refused() {
    let temp = TempDir::new().unwrap();
    let marker = temp.path().join("marker");
    let recipe = write_recipe(
        temp.path(),
        "main.in",
        &format!(
            "shell {{ name => \"dup\", command => \"touch {}\" }}\n\
             shell {{ name => \"dup\", command => \"true\" }}\n",
            marker.display()
        ),
    );

    Command::new(rigger_bin())
        .arg(&recipe)
        .assert()
        .failure()
        .stderr(predicate::str::contains("rule names must be unique"));
    assert!(!marker.exists(), "no rule may run when check fails");
}

// A require reference to a missing rule fails the check pass.
#[test]
fn test_dangling_require_refused() {
    let temp = TempDir::new().unwrap();
    let recipe = write_recipe(
        temp.path(),
        "main.in",
        "shell { name => \"A\", command => \"true\", require => \"missing\" }\n",
    );

    Command::new(rigger_bin())
        .arg(&recipe)
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "rule 'A' has reference to 'missing' which doesn't exist",
        ));
}

// A child include sees the parent's variables.
#[test]
fn test_include_inherits_environment() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("out");
    write_recipe(
        temp.path(),
        "child.in",
        &format!(
            "file {{ name => \"c\", target => \"{}\", content => \"x=${{x}}\" }}\n",
            out.display()
        ),
    );
    let main = write_recipe(
        temp.path(),
        "main.in",
        &format!(
            "let x = \"hi\"\ninclude \"{}/child.in\"\n",
            temp.path().display()
        ),
    );

    Command::new(rigger_bin()).arg(&main).assert().success();
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "x=hi");
}

#[test]
fn test_parse_error_exits_nonzero() {
    let temp = TempDir::new().unwrap();
    let recipe = write_recipe(temp.path(), "main.in", "let = \"oops\"\n");

    Command::new(rigger_bin())
        .arg(&recipe)
        .assert()
        .failure()
        .stderr(predicate::str::contains("parse error"));
}

#[test]
fn test_missing_recipe_exits_nonzero() {
    Command::new(rigger_bin())
        .arg("/no/such/recipe.in")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}

// FUZZ=FUZZ disables shell execution: the backtick result is the command
// string itself and success() is benignly true.
#[test]
fn test_fuzz_valve_disables_shell() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("out");
    let marker = temp.path().join("marker");
    let recipe = write_recipe(
        temp.path(),
        "main.in",
        &format!(
            "let cmd = `touch {marker}`\n\
             file {{ name => \"w\", target => \"{out}\", content => \"${{cmd}}\",\n\
                     if => success(\"touch {marker}\") }}\n",
            marker = marker.display(),
            out = out.display()
        ),
    );

    Command::new(rigger_bin())
        .arg(&recipe)
        .env("FUZZ", "FUZZ")
        .assert()
        .success();

    assert!(!marker.exists(), "no shell may run under FUZZ");
    assert_eq!(
        std::fs::read_to_string(&out).unwrap(),
        format!("touch {}", marker.display())
    );
}

// Files on the command line share one environment, in order.
#[test]
fn test_multiple_files_share_environment() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("out");
    let first = write_recipe(temp.path(), "first.in", "let shared = \"from-first\"\n");
    let second = write_recipe(
        temp.path(),
        "second.in",
        &format!(
            "file {{ name => \"w\", target => \"{}\", content => \"${{shared}}\" }}\n",
            out.display()
        ),
    );

    Command::new(rigger_bin())
        .arg(&first)
        .arg(&second)
        .assert()
        .success();
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "from-first");
}

// --verbose surfaces rule execution on stderr via the logger.
#[test]
fn test_verbose_logs_rules() {
    let temp = TempDir::new().unwrap();
    let recipe = write_recipe(
        temp.path(),
        "main.in",
        "shell { name => \"noisy\", command => \"true\" }\n",
    );

    Command::new(rigger_bin())
        .arg("--verbose")
        .arg(&recipe)
        .assert()
        .success()
        .stderr(predicate::str::contains("noisy"));
}

// Conditional gates keyed on host paths: one that always exists and one
// that never does.
#[test]
fn test_conditional_rule_gating() {
    let temp = TempDir::new().unwrap();
    let yes = temp.path().join("yes");
    let no = temp.path().join("no");
    let recipe = write_recipe(
        temp.path(),
        "main.in",
        &format!(
            "shell {{ name => \"runs\", command => \"touch {yes}\", if => exists(\"/\") }}\n\
             shell {{ name => \"skipped\", command => \"touch {no}\", if => exists(\"/no/such/path\") }}\n",
            yes = yes.display(),
            no = no.display()
        ),
    );

    Command::new(rigger_bin()).arg(&recipe).assert().success();
    assert!(yes.exists());
    assert!(!no.exists());
}
