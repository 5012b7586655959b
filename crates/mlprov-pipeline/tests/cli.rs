//! `mlprov` command-line tool

use mlprov_fingerprint::ContentDigest;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

const MANIFEST: &str = r#"
[namespace]
prefix = "lab"
iri = "http://lab.example/"

[session]
token = 7

[[staff]]
id = "42"
name = "Alice"

[[artifacts]]
key = "raw"
path = "a.csv"

[[artifacts]]
key = "clean"
path = "b.csv"

[[stages]]
name = "filter"
start = "2024-01-01T00:00:00Z"
end = "2024-01-01T00:01:00Z"
inputs = ["raw"]
outputs = ["clean"]
operator = "42"

[output]
dir = "out"
base = "run"
"#;

fn mlprov(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mlprov"))
        .args(args)
        .current_dir(cwd)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap()
}

fn workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.csv"), "x,y\n1,2\n").unwrap();
    fs::write(dir.path().join("b.csv"), "x,y\n").unwrap();
    fs::write(dir.path().join("run.toml"), MANIFEST).unwrap();
    dir
}

fn stdout(output: &Output) -> String {
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    String::from_utf8(output.stdout.clone()).unwrap()
}

#[test]
fn record_writes_fingerprinted_outputs() {
    let dir = workspace();
    let text = stdout(&mlprov(&["record", "run.toml"], dir.path()));

    // Paths are reported relative to the manifest's directory
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    for (line, extension) in lines.iter().zip(["provn", "dot", "json"]) {
        let relative = Path::new("out").join(format!("run.{extension}"));
        let digest = ContentDigest::compute(&fs::read(dir.path().join(&relative)).unwrap());
        assert_eq!(*line, format!("{digest}  {}", relative.display()));
    }
    let provn = fs::read_to_string(dir.path().join("out/run.provn")).unwrap();
    assert!(provn.contains("activity(lab:ml/filter/7, 2024-01-01T00:00:00Z, 2024-01-01T00:01:00Z"));
}

#[test]
fn record_honours_out_dir_and_token() {
    let dir = workspace();
    stdout(&mlprov(&["record", "run.toml", "--out-dir", "elsewhere", "--token", "9"], dir.path()));
    let provn = fs::read_to_string(dir.path().join("elsewhere/run.provn")).unwrap();
    assert!(provn.contains("lab:ml/filter/9"));
}

#[test]
fn render_matches_recorded_provn() {
    let dir = workspace();
    stdout(&mlprov(&["record", "run.toml"], dir.path()));
    let rendered = stdout(&mlprov(&["render", "run.toml"], dir.path()));
    let written = fs::read_to_string(dir.path().join("out/run.provn")).unwrap();
    assert_eq!(rendered, written);
}

#[test]
fn render_dot_and_views() {
    let dir = workspace();
    let dot = stdout(&mlprov(&["render", "run.toml", "--format", "dot"], dir.path()));
    assert!(dot.starts_with("digraph"));

    let data = stdout(&mlprov(&["render", "run.toml", "--view", "data"], dir.path()));
    assert!(data.contains("wasDerivedFrom("));
    assert!(!data.contains("activity("));
    assert!(!data.contains("agent("));
}

#[test]
fn fingerprint_prints_digest() {
    let dir = workspace();
    let text = stdout(&mlprov(&["fingerprint", "a.csv"], dir.path()));
    let digest = ContentDigest::compute(b"x,y\n1,2\n");
    assert!(text.starts_with(&format!("{digest}  ")));
    assert!(text.trim_end().ends_with("a.csv"));
}

#[test]
fn missing_manifest_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = mlprov(&["render", "nope.toml"], dir.path());
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("nope.toml"));
}
