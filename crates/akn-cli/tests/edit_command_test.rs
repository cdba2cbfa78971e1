use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn cargo_bin() -> PathBuf {
    if let Ok(path) = env::var("CARGO_BIN_EXE_akn") {
        return PathBuf::from(path);
    }
    let target_dir = env::var("CARGO_TARGET_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| repo_root().join("target"));
    target_dir
        .join("debug")
        .join(format!("akn{}", std::env::consts::EXE_SUFFIX))
}

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

fn schema_path() -> PathBuf {
    repo_root().join("crates/akn-schema/tests/data/mini_akn.xsd")
}

fn temp_path(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time should be after UNIX_EPOCH")
        .as_nanos();
    env::temp_dir().join(format!(
        "akn-cli-{name}-{}-{nanos}.yaml",
        std::process::id()
    ))
}

struct TempFile {
    path: PathBuf,
}

impl TempFile {
    fn create(name: &str, content: &str) -> Self {
        let path = temp_path(name);
        fs::write(&path, content).expect("temporary file should be created");
        Self { path }
    }

    fn empty(name: &str) -> Self {
        Self {
            path: temp_path(name),
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> String {
        fs::read_to_string(&self.path).expect("temporary file should be readable")
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn akn(args: &[&str]) -> Output {
    Command::new(cargo_bin())
        .arg("--schema")
        .arg(schema_path())
        .args(args)
        .output()
        .expect("akn should execute")
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "command failed; stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn expand_prints_expanded_profile() {
    let input = TempFile::create("expand", "");
    let text = stdout(&akn(&["expand", input.path().to_str().unwrap(), "act"]));

    assert!(text.starts_with("profile:\n  elements:\n    akomaNtoso:\n"));
    let meta = text.find("        meta: 1..1").expect("act should reference meta");
    let body = text.find("        body: 1..1").expect("act should reference body");
    assert!(meta < body);
    // printing leaves the file alone
    assert_eq!(input.read(), "");
}

#[test]
fn expand_write_then_validate_is_clean() {
    let input = TempFile::create("expand-write", "");
    let path = input.path().to_str().unwrap();
    let out = stdout(&akn(&["expand", path, "act", "--write"]));
    assert!(out.contains("updated"));

    let validation = akn(&["validate", path]);
    assert_eq!(validation.status.code(), Some(0), "{}", stdout(&validation));

    let out = stdout(&akn(&["reorder", path, "--write"]));
    assert!(out.contains("no changes"));
}

#[test]
fn collapse_removes_subtree() {
    let input = TempFile::create("collapse", "");
    let path = input.path().to_str().unwrap();
    stdout(&akn(&["expand", path, "act", "--write"]));

    let text = stdout(&akn(&["collapse", path, "meta"]));
    assert!(!text.contains("FRBRWork"));
    assert!(text.contains("    body:"));
}

#[test]
fn generate_writes_profile_with_header() {
    let output = TempFile::empty("generate");
    let path = output.path().to_str().unwrap();
    stdout(&akn(&["generate", "act", "--output", path]));

    let text = output.read();
    assert!(text.starts_with("# Minimum viable profile for <act>\n"));
    assert!(text.contains("  documentTypes:\n    - act\n"));
    assert_eq!(akn(&["validate", path]).status.code(), Some(0));
}

#[test]
fn generate_unknown_root_fails() {
    let output = akn(&["generate", "chaptr"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown element type 'chaptr'"));
}

#[test]
fn identity_remove_reports_retained_attributes() {
    let input = TempFile::create(
        "identity",
        "profile:\n  elements:\n    chapter:\n      attributes:\n        eId:\n          required: true\n        wId:\n          required: false\n",
    );
    let path = input.path().to_str().unwrap();
    let output = akn(&["identity", "remove", path, "--write"]);
    stdout(&output);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("retained eId on <chapter>"));
    let text = input.read();
    assert!(text.contains("eId:"));
    assert!(!text.contains("wId:"));
}

#[test]
fn identity_add_marks_required() {
    let input = TempFile::create("identity-add", "profile:\n  elements:\n    p:\n");
    let text = stdout(&akn(&[
        "identity",
        "add",
        input.path().to_str().unwrap(),
        "--names",
        "eId,wId",
        "--required",
    ]));
    assert!(text.contains("        eId:\n          required: true\n"));
    assert!(text.contains("        wId:\n          required: true\n"));
}

#[test]
fn schema_describes_element() {
    let text = stdout(&akn(&["schema", "body"]));
    assert!(text.contains("<body>"));
    assert!(text.contains("Choice bodyType:choice_0"));
    assert!(text.contains("hierElements: chapter, section, article, hcontainer"));

    let summary = stdout(&akn(&["schema"]));
    assert!(summary.contains("Document types: act, bill"));
}
