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
    let executable_name = format!("akn{}", std::env::consts::EXE_SUFFIX);
    let fallback = target_dir.join("debug").join(executable_name);

    if fallback.exists() {
        return fallback;
    }

    panic!(
        "CARGO_BIN_EXE_akn is not set and fallback binary was not found at {}",
        fallback.display()
    );
}

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

fn schema_path() -> PathBuf {
    repo_root().join("crates/akn-schema/tests/data/mini_akn.xsd")
}

fn unique_temp_path(name: &str, extension: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time should be after UNIX_EPOCH")
        .as_nanos();
    env::temp_dir().join(format!(
        "akn-cli-{name}-{}-{nanos}.{extension}",
        std::process::id()
    ))
}

struct TempFile {
    path: PathBuf,
}

impl TempFile {
    fn create(name: &str, extension: &str, content: &str) -> Self {
        let path = unique_temp_path(name, extension);
        fs::write(&path, content).expect("temporary file should be created");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn run_validate(input: &Path, extra: &[&str]) -> Output {
    let schema = schema_path();
    Command::new(cargo_bin())
        .args(["validate", input.to_string_lossy().as_ref(), "-s"])
        .arg(&schema)
        .args(extra)
        .output()
        .expect("akn validate should execute")
}

fn assert_exit_code(output: &Output, expected: i32) {
    let actual = output.status.code().unwrap_or(-1);
    assert_eq!(
        actual,
        expected,
        "unexpected exit code; stdout: {}; stderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

const CLEAN_BODY: &str = "\
profile:
  elements:
    body:
      children:
        choice:
          content: 1..1
          chapter: 1..*
    chapter:
      attributes:
        eId:
          required: true
      children:
        choice:
          content: 1..1
          chapter: 1..*
    content:
      children:
        p: 1..*
    p:
";

#[test]
fn validate_returns_success_for_clean_profile() {
    let input = TempFile::create("clean", "yaml", CLEAN_BODY);
    let output = run_validate(input.path(), &[]);

    assert_exit_code(&output, 0);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("0 error(s), 0 warning(s)"));
}

#[test]
fn validate_returns_error_exit_code_for_unknown_element() {
    let input = TempFile::create(
        "unknown",
        "yaml",
        &CLEAN_BODY.replace("    p:\n", "    p:\n    chaptr:\n"),
    );
    let output = run_validate(input.path(), &[]);

    assert_exit_code(&output, 2);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[vocabulary.unknown-element]"));
    assert!(stdout.contains("Did you mean 'chapter'?"));
}

#[test]
fn validate_returns_warning_exit_code_for_duplicate_structure() {
    let input = TempFile::create(
        "warning",
        "yaml",
        &CLEAN_BODY.replace(
            "    content:\n",
            "      structure:\n        - chapter\n        - chapter\n    content:\n",
        ),
    );
    let output = run_validate(input.path(), &[]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[identity.duplicate-structure-entry]"), "{stdout}");
    assert!(output.status.code() == Some(1) || output.status.code() == Some(2));
}

#[test]
fn validate_empty_file_reports_single_parse_diagnostic() {
    let input = TempFile::create("empty", "yaml", "");
    let output = run_validate(input.path(), &["--format", "json"]);

    assert_exit_code(&output, 2);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let report: serde_json::Value = serde_json::from_str(&stdout).expect("report should be JSON");
    assert_eq!(report["valid"], false);
    assert_eq!(report["diagnostics"].as_array().map(Vec::len), Some(1));
    assert_eq!(
        report["diagnostics"][0]["message"],
        "document must be a mapping."
    );
}

#[test]
fn validate_fails_without_schema() {
    let input = TempFile::create("noschema", "yaml", CLEAN_BODY);
    let output = Command::new(cargo_bin())
        .args(["validate", input.path().to_string_lossy().as_ref()])
        .output()
        .expect("akn validate should execute");

    assert_exit_code(&output, 1);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No schema configured"));
}
