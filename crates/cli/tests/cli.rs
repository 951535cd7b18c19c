use assert_cmd::Command;
use chat_codec::{decode, persist, DataReader, DataWriter, FormatVersion};
use chat_transcript::{CitationRecord, Role, TranscriptStore};
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_transcript(path: &Path, version: u32) {
    let store = TranscriptStore::new();
    store.append_prompt("Where are the docs?", Vec::new());
    let response = store.append_response();
    store.update_value(response, "In docs/.");
    store.update_thumbs_up(response, true);
    store.update_sources(vec![
        CitationRecord::new("guide.md", "Install").title("Guide"),
        CitationRecord::new("api.md", "Endpoints"),
        CitationRecord::new("guide.md", "Configure").page(2),
    ]);

    let mut writer = DataWriter::new(Vec::new());
    persist(&store, &mut writer, FormatVersion::new(version).unwrap()).unwrap();
    fs::write(path, writer.finish().unwrap()).unwrap();
}

#[allow(deprecated)]
fn cli() -> Command {
    let mut cmd = Command::cargo_bin("chat-transcript").expect("binary");
    cmd.env_remove("CHAT_TRANSCRIPT_FORMAT_VERSION")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn inspect_json_reports_entries() {
    let temp = tempdir().unwrap();
    let file = temp.path().join("chat.bin");
    write_transcript(&file, 5);

    let output = cli()
        .arg("inspect")
        .arg(&file)
        .args(["--format-version", "5", "--json"])
        .output()
        .expect("command run");
    assert!(output.status.success());

    let body: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(body["format_version"], 5);
    assert_eq!(body["count"], 2);
    assert_eq!(body["entries"][0]["role"], "prompt");
    assert_eq!(body["entries"][1]["role"], "response");
    assert_eq!(body["entries"][1]["sources"], 3);
    assert_eq!(body["entries"][1]["files"], serde_json::json!(["api.md", "guide.md"]));
    assert_eq!(body["entries"][1]["response"]["thumbs_up"], true);
}

#[test]
fn inspect_reads_version_from_environment() {
    let temp = tempdir().unwrap();
    let file = temp.path().join("chat.bin");
    write_transcript(&file, 8);

    cli()
        .env("CHAT_TRANSCRIPT_FORMAT_VERSION", "8")
        .arg("inspect")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Transcript (format v8, 2 entries)"))
        .stdout(predicate::str::contains("sources: 3 (api.md, guide.md)"));
}

#[test]
fn upgrade_rewrites_in_latest_layout() {
    let temp = tempdir().unwrap();
    let input = temp.path().join("old.bin");
    let output = temp.path().join("new.bin");
    write_transcript(&input, 5);

    cli()
        .arg("upgrade")
        .arg(&input)
        .arg(&output)
        .args(["--from", "5"])
        .assert()
        .success();

    let bytes = fs::read(&output).unwrap();
    let entries = decode(&mut DataReader::new(bytes.as_slice()), FormatVersion::LATEST).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].value(), "In docs/.");
    assert_eq!(entries[1].sources()[0].title, "Guide");
    assert_eq!(entries[1].sources()[2].page, 2);
    assert!(!temp.path().join("new.tmp").exists());
}

#[test]
fn wrong_version_fails_to_decode() {
    let temp = tempdir().unwrap();
    let file = temp.path().join("chat.bin");
    write_transcript(&file, 10);

    cli()
        .arg("inspect")
        .arg(&file)
        .args(["--format-version", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot decode"));
}

#[test]
fn misaligned_legacy_citations_are_an_error() {
    let temp = tempdir().unwrap();
    let file = temp.path().join("chat.bin");

    let mut writer = DataWriter::new(Vec::new());
    writer.write_i32(1);
    writer.write_i32(0);
    writer.write_str(Role::Response.label());
    writer.write_str("answer");
    writer.write_str("");
    writer.write_str("");
    for _ in 0..4 {
        writer.write_bool(false);
    }
    writer.write_str("1. In a.txt. [Context](context://1)\n2. In b.txt. [Context](context://2)");
    writer.write_str_list(&["only one body"]);
    fs::write(&file, writer.finish().unwrap()).unwrap();

    cli()
        .arg("inspect")
        .arg(&file)
        .args(["--format-version", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("passage bodies"))
        .stderr(predicate::str::contains("panicked").not());
}

#[test]
fn missing_file_is_an_error() {
    let temp = tempdir().unwrap();
    cli()
        .arg("inspect")
        .arg(temp.path().join("absent.bin"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot open"));
}

#[test]
fn config_limits_apply_to_decoding() {
    let temp = tempdir().unwrap();
    let file = temp.path().join("chat.bin");
    let config = temp.path().join("limits.toml");
    write_transcript(&file, 10);
    fs::write(&config, "max_entries = 1\n").unwrap();

    cli()
        .arg("--config")
        .arg(&config)
        .arg("inspect")
        .arg(&file)
        .assert()
        .failure();
}

#[test]
fn version_zero_is_rejected() {
    let temp = tempdir().unwrap();
    let file = temp.path().join("chat.bin");
    write_transcript(&file, 10);

    cli()
        .arg("inspect")
        .arg(&file)
        .args(["--format-version", "0"])
        .assert()
        .failure();
}
