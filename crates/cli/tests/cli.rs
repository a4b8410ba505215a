use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn store_fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../store/tests/data")
        .join(name)
}

#[allow(deprecated)]
fn tagclass() -> Command {
    let mut cmd = Command::cargo_bin("tagclass").expect("binary");
    cmd.arg("--quiet");
    cmd
}

fn run_json(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("command run");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid json")
}

#[test]
fn tokenize_prints_tokens() {
    let body = run_json(
        tagclass()
            .arg("tokenize")
            .arg("Worm:Win32/Silly.Gaa")
            .arg("--engine")
            .arg("Microsoft"),
    );
    assert_eq!(body, serde_json::json!(["worm", "win", "silly"]));
}

#[test]
fn parse_single_label_with_seed_vocabulary() {
    let body = run_json(
        tagclass()
            .arg("parse")
            .arg("--label")
            .arg("Backdoor:Win32/Darkshell"),
    );
    let tags = body.as_array().expect("array");
    assert_eq!(tags.len(), 3);
    assert_eq!(tags[0]["tag"], "backdoor");
    assert_eq!(tags[0]["entity"], "behavior");
    assert_eq!(tags[2]["tag"], "darkshell");
    assert_eq!(tags[2]["entity"], "family");
    assert_eq!(tags[2]["score"], 8);
}

#[test]
fn parse_corpus_writes_json_lines() {
    let temp = tempdir().unwrap();
    let out = temp.path().join("parsed.jsonl");

    tagclass()
        .arg("parse")
        .arg("--corpus")
        .arg(store_fixture("corpus.jsonl"))
        .arg("--voc")
        .arg(store_fixture("testvoc.toml"))
        .arg("--out")
        .arg(&out)
        .assert()
        .success();

    let text = fs::read_to_string(&out).unwrap();
    let rows: Vec<Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0][0], "win32.ransom.gandcrab");
    assert!(rows[0][1]
        .as_array()
        .unwrap()
        .iter()
        .any(|tag| tag["tag"] == "gandcrab" && tag["entity"] == "family"));
}

#[test]
fn parse_single_row_corpus_prints_label_pairs() {
    let temp = tempdir().unwrap();
    let corpus = temp.path().join("one.jsonl");
    fs::write(&corpus, "[\"Backdoor:Win32/Darkshell\", [\"default\"]]\n").unwrap();

    let body = run_json(tagclass().arg("parse").arg("--corpus").arg(&corpus));
    assert_eq!(body[0], "Backdoor:Win32/Darkshell");
    let tags = body[1].as_array().expect("tag array");
    assert_eq!(tags.len(), 3);
    assert_eq!(tags[2]["tag"], "darkshell");
    assert_eq!(tags[2]["entity"], "family");
}

#[test]
fn update_promotes_locator_and_dumps_snapshot() {
    let temp = tempdir().unwrap();
    let dump = temp.path().join("out/locator_voc.toml");

    let body = run_json(
        tagclass()
            .arg("update")
            .arg("--corpus")
            .arg(store_fixture("corpus.jsonl"))
            .arg("--voc")
            .arg(store_fixture("testvoc.toml"))
            .arg("--threshold-cfs")
            .arg("2")
            .arg("--dump")
            .arg(&dump)
            .arg("--sort"),
    );
    assert_eq!(body["status"], "converged");
    assert_eq!(body["threshold_cfs"], 2);
    assert_eq!(body["updated"], serde_json::json!(["ransomtest"]));

    let snapshot = fs::read_to_string(&dump).unwrap();
    assert!(snapshot.contains("[ransomtest]"));
    assert!(snapshot.contains("score = 9"));
}

#[test]
fn list_counts_entities() {
    let body = run_json(
        tagclass()
            .arg("list")
            .arg("--voc")
            .arg(store_fixture("testvoc.toml")),
    );
    assert_eq!(body["total"], 13);
    assert_eq!(body["behavior"], 6);
    assert_eq!(body["platform"], 4);
    assert_eq!(body["misc"], 3);
}

#[test]
fn config_file_sets_defaults() {
    let temp = tempdir().unwrap();
    let config = temp.path().join("tagclass.toml");
    fs::write(&config, "max_seq_length = 2\n").unwrap();

    let body = run_json(
        tagclass()
            .arg("--config")
            .arg(&config)
            .arg("tokenize")
            .arg("one.two.three.four"),
    );
    assert_eq!(body, serde_json::json!(["one", "two"]));
}

#[test]
fn missing_corpus_fails() {
    let temp = tempdir().unwrap();
    tagclass()
        .arg("update")
        .arg("--corpus")
        .arg(temp.path().join("absent.jsonl"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load corpus"));
}

#[test]
fn duplicate_vocabulary_fails() {
    tagclass()
        .arg("list")
        .arg("--voc")
        .arg(store_fixture("testvoc.toml"))
        .arg("--voc")
        .arg(store_fixture("testvoc.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load vocabulary"));
}
