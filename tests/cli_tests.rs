// Binary tests: statements via -x, --script and stdin

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

fn taskdump() -> Command {
    let mut cmd = Command::cargo_bin("taskdump").unwrap();
    cmd.arg("--no-color");
    cmd
}

#[test]
fn test_summary_of_loaded_dump() {
    taskdump()
        .arg(fixture("goroutines.txt"))
        .arg("-x")
        .arg("original")
        .assert()
        .success()
        .stdout(predicate::str::contains("# of tasks: 6"))
        .stdout(predicate::str::contains("     semacquire: 3"));
}

#[test]
fn test_dedup_then_show() {
    taskdump()
        .arg(fixture("goroutines.txt"))
        .args(["-x", "original.dedup()", "-x", "original.show()"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dedupped 6, kept 4"))
        .stdout(predicate::str::contains(
            "goroutine ~ [semacquire, ~ minutes]: 3 times: [21 22 25]",
        ))
        .stdout(predicate::str::contains("main.(*Cache).Get(...)"));
}

#[test]
fn test_json_summary() {
    taskdump()
        .arg(fixture("goroutines.txt"))
        .args(["--format", "json", "-x", "original.summary()"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total\": 6"))
        .stdout(predicate::str::contains("\"IO wait\": 1"));
}

#[test]
fn test_bad_expression_fails_in_exec_mode() {
    taskdump()
        .arg(fixture("goroutines.txt"))
        .args(["-x", "original.delete(\"contains(trace)\")"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "contains() accepts exactly 2 argument(s), got 1",
        ));
}

#[test]
fn test_missing_dump_file() {
    taskdump()
        .arg("/nonexistent/goroutines.txt")
        .arg("-x")
        .arg("original")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load"));
}

#[test]
fn test_script_with_diff_and_save() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("new.txt");
    let script = tmp.path().join("session.txt");
    fs::write(
        &script,
        format!(
            "# compare two dumps\n\
             later = load({:?})\n\
             gone, both, fresh = original.diff(later)\n\
             both.keep(\"duration > 20\")\n\
             fresh.save({:?})\n\
             whos\n",
            fixture("goroutines_later.txt"),
            out.display().to_string()
        ),
    )
    .unwrap();

    taskdump()
        .arg(fixture("goroutines.txt"))
        .arg("--script")
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted 1 tasks, kept 1."))
        .stdout(predicate::str::contains("           gone: 4 tasks"))
        .stdout(predicate::str::contains("          fresh: 1 tasks"));

    let saved = fs::read_to_string(&out).unwrap();
    assert_eq!(
        saved,
        "goroutine 40 [select]:\nmain.(*Ticker).loop(0xc0001a0000)\n\t/app/internal/tick/tick.go:19 +0x9c\n\n"
    );
}

#[test]
fn test_stdin_session_reports_errors_and_continues() {
    taskdump()
        .arg(fixture("goroutines.txt"))
        .write_stdin("original.keep(\"nope(\")\noriginal.search(\"state == 'IO wait'\")\nexit\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("error: Invalid expression"))
        .stdout(predicate::str::contains("Search with offset 0 and limit 10."))
        .stdout(predicate::str::contains("goroutine 7 [IO wait]:"));
}

#[test]
fn test_config_search_limit_and_prefix() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("taskdump.toml");
    fs::write(
        &config,
        "[loader]\nheader_prefix = \"task \"\n\n[display]\nsearch_limit = 1\n",
    )
    .unwrap();
    let dump = tmp.path().join("tasks.txt");
    fs::write(
        &dump,
        "task 1 [parked]:\nworker.run()\n\ntask 2 [parked]:\nworker.run()\n",
    )
    .unwrap();

    taskdump()
        .arg(&dump)
        .arg("--config")
        .arg(&config)
        .args(["-x", "original.search(\"state == 'parked'\")"])
        .assert()
        .success()
        .stdout(predicate::str::contains("limit 1."))
        .stdout(predicate::str::contains("task 1 [parked]:"))
        .stdout(predicate::str::contains("task 2 [parked]:").not());
}
