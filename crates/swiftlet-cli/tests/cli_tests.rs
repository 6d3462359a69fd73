use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn swiftlet() -> Command {
    Command::cargo_bin("swiftlet").unwrap()
}

#[test]
fn test_compiles_stdin_to_stdout() {
    swiftlet()
        .arg("--no-color")
        .write_stdin("let x = 1 + 2\nwrite(x)\n")
        .assert()
        .success()
        .stdout(predicate::str::starts_with(".IFJcode23\n"))
        .stdout(predicate::str::contains("ADDS"))
        .stdout(predicate::str::contains("EXIT int@0"));
}

#[test]
fn test_writes_output_file() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("main.swift");
    let output = dir.path().join("main.code");
    fs::write(&input, "var s = \"a b\"\nwrite(s)\n").unwrap();

    swiftlet()
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let code = fs::read_to_string(&output).unwrap();
    assert!(code.contains("PUSHS string@a\\032b"));
}

#[test]
fn test_exit_code_matches_error_kind() {
    let cases = [
        ("let x = 1 @ 2", 1),
        ("let x = ", 2),
        ("foo()", 3),
        ("func f(_ a: Int) {}\nf(\"x\")", 4),
        ("write(y)", 5),
        ("func f() -> Int {\n}", 6),
        ("let s = \"a\" - 1", 7),
        ("let n = nil", 8),
        ("let a = 1\na = 2", 9),
    ];

    for (source, code) in cases {
        swiftlet()
            .arg("--no-color")
            .write_stdin(source)
            .assert()
            .code(code)
            .stdout(predicate::str::is_empty());
    }
}

#[test]
fn test_error_output_names_file() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("broken.swift");
    let output = dir.path().join("broken.code");
    fs::write(&input, "write(missing)\n").unwrap();

    swiftlet()
        .arg("--no-color")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .code(5)
        .stderr(predicate::str::contains("broken.swift"))
        .stderr(predicate::str::contains("missing"));

    assert!(!output.exists());
}

#[test]
fn test_config_file() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("swiftlet.toml");
    fs::write(&config, "unwrap_exit_code = 42\nemit_comments = true\n").unwrap();

    swiftlet()
        .arg("-c")
        .arg(&config)
        .write_stdin("func f(_ a: Int?) -> Int {\n    return a!\n}\nlet y = f(nil)\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("# func f"))
        .stdout(predicate::str::contains("EXIT int@42"));
}

#[test]
fn test_invalid_config_value() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("swiftlet.toml");
    fs::write(&config, "unwrap_exit_code = 50\n").unwrap();

    swiftlet().arg("-c").arg(&config).write_stdin("write(1)").assert().code(9);
}

#[test]
fn test_missing_input_file() {
    swiftlet()
        .arg("--no-color")
        .arg("does-not-exist.swift")
        .assert()
        .code(99)
        .stderr(predicate::str::contains("does-not-exist.swift"));
}
