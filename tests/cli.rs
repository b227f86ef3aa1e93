// End-to-end tests for the krscript binary: execution, error rendering, and
// the --debug artifact dumps.

use std::fs;

use assert_cmd::Command;
use tempfile::tempdir;

fn krscript() -> Command {
    Command::cargo_bin("krscript").expect("binary builds")
}

#[test]
fn runs_a_script_and_prints_to_stdout() {
    let dir = tempdir().unwrap();
    let script = dir.path().join("hello.kr");
    fs::write(&script, "print('hello from kr');\n").unwrap();

    krscript()
        .arg(&script)
        .assert()
        .success()
        .stdout("hello from kr\n");
}

#[test]
fn runtime_errors_exit_nonzero_with_code_and_position() {
    let dir = tempdir().unwrap();
    let script = dir.path().join("broken.kr");
    fs::write(&script, "print(missing);\n").unwrap();

    let assert = krscript().arg(&script).assert().failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(stderr.contains("E004"), "stderr was: {stderr}");
    assert!(stderr.contains("Undefined variable missing"));
    assert!(stderr.contains("broken.kr:1:"));
}

#[test]
fn syntax_errors_carry_the_syntax_code() {
    let dir = tempdir().unwrap();
    let script = dir.path().join("syntax.kr");
    fs::write(&script, "let = 5;\n").unwrap();

    let assert = krscript().arg(&script).assert().failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(stderr.contains("E001"), "stderr was: {stderr}");
}

#[test]
fn debug_flag_writes_token_and_parse_tree_artifacts() {
    let dir = tempdir().unwrap();
    let script = dir.path().join("dump.kr");
    fs::write(&script, "let x = 1 + 2;\nprint(x);\n").unwrap();

    krscript().arg(&script).arg("--debug").assert().success();

    let tokens_path = dir.path().join("dump-tokens.json");
    let tree_path = dir.path().join("dump-parseTree.json");
    assert!(tokens_path.exists());
    assert!(tree_path.exists());

    let tokens: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&tokens_path).unwrap()).unwrap();
    let token_list = tokens.as_array().expect("token dump is a JSON array");
    assert!(token_list.iter().any(|token| token["kind"] == "Let"));
    assert!(token_list.last().unwrap()["kind"] == "Eof");

    let tree: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&tree_path).unwrap()).unwrap();
    assert!(tree["body"].is_array());
}

#[test]
fn missing_file_is_a_readable_error() {
    let assert = krscript().arg("does-not-exist.kr").assert().failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(stderr.contains("failed to read"));
}
