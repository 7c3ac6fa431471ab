use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;
use tempfile::TempDir;

fn vault() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    std::fs::create_dir_all(root.join("Classes")).unwrap();
    std::fs::write(
        root.join("Classes/Book.md"),
        "---\nfields:\n  - {name: Title, id: titl01}\n  - {name: Rating, id: rate01, type: Number}\n---\n",
    )
    .unwrap();
    std::fs::write(root.join("dune.md"), "---\nfileClass: Book\nRating: 5\n---\n").unwrap();
    std::fs::write(root.join(".metamenu.yaml"), "classFilesPath: Classes/\n").unwrap();
    tmp
}

#[test]
fn test_index_prints_summary() {
    let tmp = vault();
    let mut cmd = Command::cargo_bin("metamenu").unwrap();
    cmd.arg("index").arg(tmp.path());
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("classes: 1"))
        .stdout(predicate::str::contains("documents: 1"));
}

#[test]
fn test_fields_as_json() {
    let tmp = vault();
    let mut cmd = Command::cargo_bin("metamenu").unwrap();
    cmd.arg("--format").arg("json").arg("fields").arg(tmp.path()).arg("dune.md");

    let output = cmd.assert().success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["path"], "dune.md");
    assert_eq!(value["fields"]["resolved"][1]["name"], "Rating");
    assert_eq!(value["fields"]["classes"][0], "Book");
}

#[test]
fn test_unknown_document_fails() {
    let tmp = vault();
    let mut cmd = Command::cargo_bin("metamenu").unwrap();
    cmd.arg("fields").arg(tmp.path()).arg("nope.md");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("nope.md"));
}

#[test]
fn test_new_id_is_six_characters() {
    let tmp = vault();
    let mut cmd = Command::cargo_bin("metamenu").unwrap();
    cmd.arg("-q").arg("new-id").arg(tmp.path());

    let output = cmd.assert().success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let id = stdout.trim();
    assert_eq!(id.len(), 6);
    assert_ne!(id, "titl01");
}

#[test]
fn test_missing_vault_fails() {
    let mut cmd = Command::cargo_bin("metamenu").unwrap();
    cmd.arg("classes").arg("/definitely/not/a/vault");
    cmd.assert().failure();
}
