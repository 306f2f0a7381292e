// CLI smoke tests: exit status, report output and miette-rendered errors.
// Requires: assert_cmd, predicates crates in [dev-dependencies]

mod support;

use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};

use support::bench_tree;

const QUICK_CONFIG: &str = r#"{
  "measure": { "minSamples": 2, "maxTime": 0, "minTime": 0, "maxIterations": 3 }
}"#;

#[test]
fn runs_benches_and_prints_the_returned_report() {
    let dir = bench_tree(&[
        ("barbell.config.json", QUICK_CONFIG),
        (
            "math.bench.bb",
            r#"(suite "math" (fn () (test "add" (fn () (+ 1 2)))))"#,
        ),
    ]);

    let mut cmd = Command::cargo_bin("barbell").unwrap();
    cmd.arg("--root-dir")
        .arg(dir.path())
        .args(["-R", "barbell-reporter-json"]);
    cmd.assert()
        .success()
        .stdout(contains("\"relativePath\": \"./math.bench.bb\"").and(contains("Done. (")));
}

#[test]
fn console_reporter_is_the_default() {
    let dir = bench_tree(&[
        ("barbell.config.json", QUICK_CONFIG),
        (
            "lists.bench.bb",
            r#"(suite "lists" (fn ()
                 (test "push" (fn () (push '(1 2) 3)))
                 (test.skip "later" (fn () 0))))"#,
        ),
    ]);

    let mut cmd = Command::cargo_bin("barbell").unwrap();
    cmd.arg("--root-dir").arg(dir.path()).arg("*.bench.bb");
    cmd.assert().success().stdout(
        contains("Suite #1: lists")
            .and(contains("Test #2: later (skipped)"))
            .and(contains("ops/sec")),
    );
}

#[test]
fn no_files_found_fails_with_a_diagnostic() {
    let dir = bench_tree(&[("notes.txt", "")]);

    let mut cmd = Command::cargo_bin("barbell").unwrap();
    cmd.arg("--root-dir").arg(dir.path());
    cmd.assert()
        .failure()
        .code(1)
        .stderr(contains("barbell::discovery::no_files"));
}

#[test]
fn stop_on_errors_exits_non_zero() {
    let dir = bench_tree(&[
        ("barbell.config.json", QUICK_CONFIG),
        (
            "bad.bench.bb",
            r#"(suite "s" (fn () (test "t" (fn () (throw "nope")))))"#,
        ),
    ]);

    let mut cmd = Command::cargo_bin("barbell").unwrap();
    cmd.arg("--root-dir").arg(dir.path()).arg("-x");
    cmd.assert()
        .failure()
        .stderr(contains("barbell::orchestrator::bench_failed").or(contains("nope")));
}
