//! Binary-level tests for `ml` against a throwaway model root.

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tempfile::TempDir;

/// Test context with a throwaway model root.
struct TestContext {
    temp_dir: TempDir,
    mlhub_home: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let mlhub_home = temp_dir.path().join(".mlhub");
        Self {
            temp_dir,
            mlhub_home,
        }
    }

    fn ml_cmd(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_ml"));
        cmd.env("HOME", self.temp_dir.path());
        cmd.env("MLHUB_HOME", &self.mlhub_home);
        cmd.env_remove("MLHUB_REPO");
        cmd.stdin(Stdio::null());
        cmd
    }

    /// Lay out an installed package by hand.
    fn install_package(&self, name: &str, manifest: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir = self.mlhub_home.join(name);
        fs::create_dir_all(&dir).expect("failed to create package dir");
        fs::write(dir.join("MLHUB.yaml"), manifest).expect("failed to write manifest");
        for (file, body) in files {
            fs::write(dir.join(file), body).expect("failed to write package file");
        }
        dir
    }
}

const HELLO: &str = "\
meta:
  name: hello
  title: Say hello.
  version: 1.0.0
  languages: sh
commands:
  greet: Print a greeting
";

#[test]
fn test_help_command() {
    let ctx = TestContext::new();
    let output = ctx.ml_cmd().arg("--help").output().expect("failed to run ml");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
}

#[test]
fn test_version_command() {
    let ctx = TestContext::new();
    let output = ctx
        .ml_cmd()
        .arg("--version")
        .output()
        .expect("failed to run ml");
    assert!(output.status.success());
}

#[test]
fn test_installed_on_empty_home() {
    let ctx = TestContext::new();
    let output = ctx
        .ml_cmd()
        .arg("installed")
        .output()
        .expect("failed to run ml");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("does not exist"));
}

#[test]
fn test_installed_lists_and_tallies_broken() {
    let ctx = TestContext::new();
    ctx.install_package("hello", HELLO, &[]);
    ctx.install_package("broken", "meta: [not, a, map\n", &[]);

    let output = ctx
        .ml_cmd()
        .arg("installed")
        .output()
        .expect("failed to run ml");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Found 2 models installed"));
    assert!(stdout.contains("hello"));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("broken"));

    let completions = fs::read_to_string(ctx.mlhub_home.join(".command_completion")).unwrap();
    assert_eq!(completions, "greet\n");
}

#[test]
fn test_commands_lists_declared_commands() {
    let ctx = TestContext::new();
    ctx.install_package("hello", HELLO, &[]);

    let output = ctx
        .ml_cmd()
        .args(["commands", "hello"])
        .output()
        .expect("failed to run ml");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("The 'hello' model (say hello) supports the following commands:"));
    assert!(stdout.contains("$ ml greet hello"));
}

#[test]
fn test_readme_missing_fails() {
    let ctx = TestContext::new();
    ctx.install_package("hello", HELLO, &[]);

    let output = ctx
        .ml_cmd()
        .args(["readme", "hello"])
        .output()
        .expect("failed to run ml");
    assert!(!output.status.success());
}

#[test]
fn test_unknown_model_fails_with_hint() {
    let ctx = TestContext::new();
    let output = ctx
        .ml_cmd()
        .args(["demo", "nosuch"])
        .output()
        .expect("failed to run ml");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ml install nosuch"));
}

#[test]
fn test_unknown_command_is_not_remembered() {
    let ctx = TestContext::new();
    ctx.install_package("hello", HELLO, &[]);

    let output = ctx
        .ml_cmd()
        .args(["gret", "hello"])
        .output()
        .expect("failed to run ml");
    assert_eq!(output.status.code(), Some(1));
    let completions =
        fs::read_to_string(ctx.mlhub_home.join(".command_completion")).unwrap_or_default();
    assert!(!completions.contains("gret"));
}

#[cfg(unix)]
#[test]
fn test_dispatch_runs_shell_script() {
    use std::os::unix::fs::PermissionsExt;

    let ctx = TestContext::new();
    let dir = ctx.install_package(
        "hello",
        HELLO,
        &[(
            "greet.sh",
            "#!/bin/sh\necho \"hello from $_MLHUB_MODEL_NAME $1\"\n",
        )],
    );
    let script = dir.join("greet.sh");
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let output = ctx
        .ml_cmd()
        .args(["greet", "hello", "world"])
        .output()
        .expect("failed to run ml");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("hello from hello world"));

    let completions = fs::read_to_string(ctx.mlhub_home.join(".command_completion")).unwrap();
    assert_eq!(completions, "greet\n");
}

#[cfg(unix)]
#[test]
fn test_dispatch_propagates_exit_code() {
    use std::os::unix::fs::PermissionsExt;

    let ctx = TestContext::new();
    let dir = ctx.install_package(
        "hello",
        HELLO,
        &[("greet.sh", "#!/bin/sh\necho boom >&2\nexit 3\n")],
    );
    fs::set_permissions(dir.join("greet.sh"), fs::Permissions::from_mode(0o755)).unwrap();

    let output = ctx
        .ml_cmd()
        .args(["greet", "hello"])
        .output()
        .expect("failed to run ml");
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("An error was encountered:"));
    assert!(stderr.contains("boom"));
}
