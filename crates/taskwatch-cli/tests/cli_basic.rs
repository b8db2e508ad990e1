//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary against a throwaway config file.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

const TASKS_JSON: &str = r#"[
    {"id": 1, "name": "Pay rent", "endDateTime": {"date": "01-01-2020"}},
    {"id": 2, "name": "Plan offsite", "endDateTime": {"date": "2099-06-01"}},
    {"id": 3, "name": "Old ticket", "status": "Done", "endDateTime": {"date": "01-01-2020"}}
]"#;

struct Sandbox {
    dir: tempfile::TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let sandbox = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        std::fs::write(sandbox.tasks_file(), TASKS_JSON).unwrap();
        sandbox
    }

    fn config(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    fn tasks_file(&self) -> PathBuf {
        self.dir.path().join("tasks.json")
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_taskwatch"));
        cmd.arg("--config")
            .arg(self.config())
            .args(args)
            .env("RUST_LOG", "warn")
            .env("TASKWATCH_ENV", "dev")
            .env("HOME", self.dir.path());
        cmd
    }

    /// Run a CLI command and return (stdout, stderr, exit code).
    fn run(&self, args: &[&str]) -> (String, String, i32) {
        let output = self
            .command(args)
            .output()
            .expect("Failed to execute CLI command");
        (
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
            output.status.code().unwrap_or(-1),
        )
    }

    fn run_ok(&self, args: &[&str]) -> String {
        let (stdout, stderr, code) = self.run(args);
        assert_eq!(code, 0, "command {args:?} failed: {stderr}");
        stdout
    }

    fn use_tasks_file(&self) {
        let path = self.tasks_file();
        self.run_ok(&["config", "set", "source.tasks_file", path_str(&path)]);
    }
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_config_path_honours_flag() {
    let sandbox = Sandbox::new();
    let stdout = sandbox.run_ok(&["config", "path"]);
    assert_eq!(stdout.trim(), path_str(&sandbox.config()));
}

#[test]
fn test_config_get_writes_defaults() {
    let sandbox = Sandbox::new();
    assert_eq!(sandbox.run_ok(&["config", "get", "limits.global_cap"]).trim(), "10");
    assert!(sandbox.config().exists());
}

#[test]
fn test_config_set_persists() {
    let sandbox = Sandbox::new();
    sandbox.run_ok(&["config", "set", "limits.per_category_cap", "3"]);
    assert_eq!(
        sandbox.run_ok(&["config", "get", "limits.per_category_cap"]).trim(),
        "3"
    );

    let list = sandbox.run_ok(&["config", "list"]);
    assert!(list.contains("limits.per_category_cap = 3"));
}

#[test]
fn test_config_set_unknown_key_fails() {
    let sandbox = Sandbox::new();
    let (_, stderr, code) = sandbox.run(&["config", "set", "limits.nope", "1"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_config_set_zero_cap_fails() {
    let sandbox = Sandbox::new();
    let (_, _, code) = sandbox.run(&["config", "set", "limits.global_cap", "0"]);
    assert_eq!(code, 1);
    assert_eq!(sandbox.run_ok(&["config", "get", "limits.global_cap"]).trim(), "10");
}

#[test]
fn test_config_list_json() {
    let sandbox = Sandbox::new();
    let stdout = sandbox.run_ok(&["config", "list", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["polling"]["interval_secs"], 300);
    assert_eq!(parsed["source"]["kind"], "file");
}

#[test]
fn test_check_json_counts_categories() {
    let sandbox = Sandbox::new();
    let tasks_file = sandbox.tasks_file();
    let stdout = sandbox.run_ok(&["check", "--tasks-file", path_str(&tasks_file), "--json"]);

    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["overdue"], 1);
    assert_eq!(report["current"], 1);
    assert_eq!(report["excluded"], 1);
    assert_eq!(report["tasks"][0]["classification"], "overdue");
    assert_eq!(report["tasks"][0]["due"], "01.01.2020");
}

#[test]
fn test_check_without_tasks_file_fails() {
    let sandbox = Sandbox::new();
    let (_, stderr, code) = sandbox.run(&["check"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("source.tasks_file"));
}

#[test]
fn test_auth_test_reports_reachable_source() {
    let sandbox = Sandbox::new();
    sandbox.use_tasks_file();

    let stdout = sandbox.run_ok(&["auth", "test"]);
    assert_eq!(stdout.trim(), "connected (file): 3 tasks");
}

#[test]
fn test_auth_test_fails_for_unreadable_source() {
    let sandbox = Sandbox::new();
    let missing = sandbox.dir.path().join("missing.json");
    sandbox.run_ok(&["config", "set", "source.tasks_file", path_str(&missing)]);

    let (_, stderr, code) = sandbox.run(&["auth", "test"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_watch_once_prints_notices() {
    let sandbox = Sandbox::new();
    sandbox.use_tasks_file();

    let stdout = sandbox.run_ok(&["watch", "--once"]);
    assert!(stdout.contains("[1] OVERDUE: Pay rent"));
    assert!(stdout.contains("[2] TASK: Plan offsite"));
    assert!(!stdout.contains("Old ticket"));
    assert!(stdout.contains("shown: 2"));
}

#[test]
fn test_watch_exits_on_quit() {
    let sandbox = Sandbox::new();
    sandbox.use_tasks_file();

    let mut child = sandbox
        .command(&["watch"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"done 1\nquit\n")
        .unwrap();

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
}
