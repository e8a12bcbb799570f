//! Exit status of the `identity-service` binary.

use std::fs;
use std::process::{Command, Output};

use tempfile::NamedTempFile;

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_identity-service"))
        .args(args)
        .env("IDENTITY_ARGON2_MEMORY_KIB", "64")
        .env("IDENTITY_ARGON2_ITERATIONS", "1")
        .env("IDENTITY_ARGON2_PARALLELISM", "1")
        .env("RUST_LOG", "error")
        .env_remove("IDENTITY_PASSWORD")
        .output()
        .expect("binary should run")
}

fn created_record() -> NamedTempFile {
    let output = run(&[
        "create",
        "--email",
        "a@b.com",
        "--first-name",
        "Jane",
        "--last-name",
        "Doe",
        "--password",
        "secret123",
    ]);
    assert!(output.status.success(), "create failed: {:?}", output);

    let file = NamedTempFile::new().expect("temp file");
    fs::write(file.path(), &output.stdout).unwrap();
    file
}

#[test]
fn test_verify_matching_password_exits_zero() {
    let record = created_record();
    let path = record.path().to_str().unwrap();

    let output = run(&["verify", "--record", path, "--password", "secret123"]);

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "match");
}

#[test]
fn test_verify_wrong_password_exits_one() {
    let record = created_record();
    let path = record.path().to_str().unwrap();

    let output = run(&["verify", "--record", path, "--password", "secret123x"]);

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "no match");
}

#[test]
fn test_create_rejects_short_password() {
    let output = run(&[
        "create",
        "--email",
        "a@b.com",
        "--first-name",
        "Jane",
        "--last-name",
        "Doe",
        "--password",
        "short",
    ]);

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}
