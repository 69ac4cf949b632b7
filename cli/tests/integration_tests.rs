//! End-to-end shell tests driving the binary in one-shot mode.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

const SCHEMA: &str = r#"{
    "tables": {
        "person": {
            "plural": "people",
            "columns": {
                "name": "n (*str): full name",
                "age": "a (int): age in years"
            },
            "meta-columns": ["created_at", "deleted_at"]
        }
    }
}"#;

fn write_schema(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("schema.json");
    fs::write(&path, SCHEMA).expect("failed to write schema");
    path
}

fn run(schema: &Path, db: &Path, line: &str) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cmdforge"))
        .arg(schema)
        .arg("-d")
        .arg(db)
        .arg("-c")
        .arg(line)
        .output()
        .expect("failed to run binary")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn test_create_then_list_persists_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let schema = write_schema(dir.path());
    let db = dir.path().join("app.db");

    let created = run(&schema, &db, "create people -n Ada -a 36");
    assert!(created.status.success());
    assert!(stdout(&created).contains("SUCCESS on create 1 person"));

    let listed = run(&schema, &db, "list people");
    let text = stdout(&listed);
    assert!(text.contains("Ada"));
    assert!(text.contains("FOUND 1/1 person"));
}

#[test]
fn test_dispatch_without_table_selector_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let schema = write_schema(dir.path());
    let db = dir.path().join("app.db");

    // No table selector: the command must not silently pick a table.
    let created = run(&schema, &db, "create -n Bo -a 40");
    let errors = stderr(&created);
    assert!(errors.contains("needs one of"));
    assert!(errors.contains("people"));

    let listed = run(&schema, &db, "list people");
    assert!(stdout(&listed).contains("NOT FOUND"));
}

#[test]
fn test_soft_delete_hides_records_from_list() {
    let dir = tempfile::tempdir().unwrap();
    let schema = write_schema(dir.path());
    let db = dir.path().join("app.db");

    run(&schema, &db, "create people -n Ada -a 36");
    let deleted = run(&schema, &db, "delete people 1");
    assert!(stdout(&deleted).contains("SUCCESS on delete 1 person"));

    let listed = run(&schema, &db, "list people");
    assert!(stdout(&listed).contains("NOT FOUND"));
    // Still visible with --all.
    let all = run(&schema, &db, "list people --all");
    assert!(stdout(&all).contains("Ada"));
}

#[test]
fn test_export_without_path_prints_rendered_output() {
    let dir = tempfile::tempdir().unwrap();
    let schema = write_schema(dir.path());
    let db = dir.path().join("app.db");

    run(&schema, &db, "create people -n Ada -a 36");
    let exported = run(&schema, &db, "export people name age -f csv");
    let text = stdout(&exported);
    assert!(text.contains("name,age"));
    assert!(text.contains("Ada,36"));
}

#[test]
fn test_missing_required_argument_reports_usage() {
    let dir = tempfile::tempdir().unwrap();
    let schema = write_schema(dir.path());
    let db = dir.path().join("app.db");

    let failed = run(&schema, &db, "create people -a 36");
    assert!(stderr(&failed).contains("--name"));
}

#[test]
fn test_unknown_command_suggests_help() {
    let dir = tempfile::tempdir().unwrap();
    let schema = write_schema(dir.path());
    let db = dir.path().join("app.db");

    let failed = run(&schema, &db, "frobnicate");
    assert!(stderr(&failed).contains("unknown command [frobnicate]"));
}

#[test]
fn test_help_lists_visible_commands_only() {
    let dir = tempfile::tempdir().unwrap();
    let schema = write_schema(dir.path());
    let db = dir.path().join("app.db");

    let helped = run(&schema, &db, "help");
    let text = stdout(&helped);
    assert!(text.contains("Record Commands"));
    assert!(text.contains("create"));
    // Per-table expansions stay hidden.
    assert!(!text.contains("create_people"));
}
