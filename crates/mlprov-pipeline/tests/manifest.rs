//! Manifest replay

use mlprov_export::serialize;
use mlprov_model::NodeKind;
use mlprov_pipeline::{Manifest, ManifestError, RecordError};
use std::fs;
use std::path::Path;

const MANIFEST: &str = r#"
[namespace]
prefix = "lab"
iri = "http://lab.example/"

[session]
token = 7

[institution]
name = "Example Lab"

[[staff]]
id = "42"
name = "Alice"

[[artifacts]]
key = "raw"
path = "a.csv"
rows = 2
columns = 2

[[artifacts]]
key = "clean"
path = "b.csv"

[[objects]]
key = "model"
kind = "model"
attributes = { algorithm = "random_forest" }

[[stages]]
name = "filter"
start = "2024-01-01T00:00:00Z"
end = "2024-01-01T00:01:00Z"
inputs = ["raw"]
outputs = ["clean"]
operator = "42"

[[stages]]
name = "train"
inputs = ["clean"]
outputs = ["model"]
operator = "42"

[[metrics]]
key = "accuracy"
name = "accuracy"
value = 0.93
subject = "model"

[approval]
approver = "42"
subjects = ["model", "accuracy"]
at = "2024-01-02T00:00:00Z"

[output]
dir = "out"
base = "run"
"#;

fn workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.csv"), "x,y\n1,2\n").unwrap();
    fs::write(dir.path().join("b.csv"), "x,y\n").unwrap();
    dir
}

#[test]
fn replay_builds_valid_document() {
    let dir = workspace();
    let manifest: Manifest = MANIFEST.parse().unwrap();
    let doc = manifest.record(dir.path()).unwrap();

    assert!(doc.validate().is_ok());
    assert_eq!(doc.nodes_of_kind(NodeKind::Entity).count(), 5);
    assert_eq!(doc.nodes_of_kind(NodeKind::Activity).count(), 2);
    assert_eq!(doc.nodes_of_kind(NodeKind::Agent).count(), 2);

    let text = serialize(&doc).unwrap();
    assert!(text.contains("prefix lab <http://lab.example/>"));
    assert!(text.contains("activity(lab:ml/filter/7, 2024-01-01T00:00:00Z, 2024-01-01T00:01:00Z"));
    assert!(text.contains("activity(lab:ml/train/7, -, -"));
    assert!(text.contains("lab:algorithm=\"random_forest\""));
    assert!(text.contains("entity(lab:records/7"));
}

#[test]
fn replay_is_reproducible_with_fixed_token() {
    let dir = workspace();
    let manifest: Manifest = MANIFEST.parse().unwrap();
    let first = serialize(&manifest.record(dir.path()).unwrap()).unwrap();
    let second = serialize(&manifest.record(dir.path()).unwrap()).unwrap();
    // File creation times come from the filesystem, so they match too
    assert_eq!(first, second);
}

#[test]
fn load_from_disk() {
    let dir = workspace();
    let path = dir.path().join("run.toml");
    fs::write(&path, MANIFEST).unwrap();
    let manifest = Manifest::load(&path).unwrap();
    assert_eq!(manifest.output.base, "run");
    assert_eq!(manifest.recorder_config().prefix, "lab");
    assert_eq!(manifest.recorder_config().fixed_token, Some(7));
}

#[test]
fn unknown_key_is_reported() {
    let dir = workspace();
    let manifest: Manifest = r#"
[[stages]]
name = "filter"
inputs = ["ghost"]
"#
    .parse()
    .unwrap();
    let err = manifest.record(dir.path()).unwrap_err();
    assert!(matches!(err, RecordError::Manifest(ManifestError::UnknownKey(k)) if k == "ghost"));
}

#[test]
fn unknown_operator_is_reported() {
    let dir = workspace();
    let manifest: Manifest = r#"
[[stages]]
name = "filter"
operator = "99"
"#
    .parse()
    .unwrap();
    let err = manifest.record(dir.path()).unwrap_err();
    assert!(matches!(err, RecordError::Manifest(ManifestError::UnknownStaff(_))));
}

#[test]
fn duplicate_key_is_reported() {
    let dir = workspace();
    let manifest: Manifest = r#"
[[artifacts]]
key = "raw"
path = "a.csv"

[[objects]]
key = "raw"
kind = "model"
"#
    .parse()
    .unwrap();
    let err = manifest.record(dir.path()).unwrap_err();
    assert!(matches!(err, RecordError::Manifest(ManifestError::DuplicateKey(_))));
}

#[test]
fn unknown_field_is_parse_error() {
    let err = "[namespace]\nprefix = \"ex\"\niri = \"http://example.org/\"\nextra = 1\n"
        .parse::<Manifest>()
        .unwrap_err();
    assert!(matches!(err, ManifestError::Parse(_)));
}

#[test]
fn missing_manifest_is_read_error() {
    let err = Manifest::load(Path::new("/definitely/not/here.toml")).unwrap_err();
    assert!(matches!(err, ManifestError::Read { .. }));
}

#[test]
fn outputs_written_next_to_manifest() {
    let dir = workspace();
    let manifest: Manifest = MANIFEST.parse().unwrap();
    let doc = manifest.record(dir.path()).unwrap();
    let out = dir.path().join(&manifest.output.dir);
    let written =
        mlprov_export::write_outputs_with(&doc, &out, &manifest.output.base, &manifest.output.options()).unwrap();
    assert_eq!(written.len(), 3);
    assert!(out.join("run.provn").exists());
    assert!(out.join("run.json").exists());
}
