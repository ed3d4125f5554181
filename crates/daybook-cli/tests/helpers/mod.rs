use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::TempDir;

/// Test harness for running CLI commands with temporary databases
pub struct CliTestHarness {
    temp_dir: TempDir,
    db_path: PathBuf,
}

impl CliTestHarness {
    /// Create a new test harness with a temporary database
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");

        Self { temp_dir, db_path }
    }

    /// Get a Command instance configured for testing: UTC, no sun lookup and
    /// no config file from the developer's working directory.
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("daybook").expect("Failed to find daybook binary");

        cmd.current_dir(self.temp_dir.path())
            .env("DAYBOOK_DATABASE_PATH", &self.db_path)
            .env("DAYBOOK_PROFILE__TIMEZONE", "UTC")
            .env("DAYBOOK_SUN__ENABLED", "false")
            .env_remove("RUST_LOG");

        cmd
    }

    /// Helper to run a command and assert success
    pub fn run_success(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().success()
    }

    /// Helper to run a command and assert failure
    pub fn run_failure(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().failure()
    }

    /// Runs a command that must succeed and returns its stdout without
    /// terminal colour codes.
    pub fn stdout_of(&self, args: &[&str]) -> String {
        let output = self.run_success(args).get_output().stdout.clone();
        strip_ansi(&String::from_utf8_lossy(&output))
    }

    /// Adds a routine and returns the short id it was given.
    pub fn add_routine(&self, args: &[&str]) -> String {
        let mut full = vec!["routine", "add"];
        full.extend_from_slice(args);
        let stdout = self.stdout_of(&full);
        let open = stdout.rfind('[').expect("short id in output");
        let close = stdout.rfind(']').expect("short id in output");
        stdout[open + 1..close].to_string()
    }

    /// Activity ids on the timeline for `date`, read from the JSON output.
    pub fn activity_ids(&self, date: &str) -> Vec<String> {
        let stdout = self.stdout_of(&["timeline", date, "--json"]);
        let points: serde_json::Value = serde_json::from_str(&stdout).expect("timeline JSON");
        points
            .as_array()
            .expect("array of points")
            .iter()
            .flat_map(|p| p["entries"].as_array().cloned().unwrap_or_default())
            .filter_map(|e| e["activity_id"].as_str().map(String::from))
            .collect()
    }
}

fn strip_ansi(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            // Skip "ESC [ ... letter"
            for next in chars.by_ref() {
                if next.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Common test fixtures
pub struct TestFixtures;

impl TestFixtures {
    /// Run on Monday, Wednesday and Friday from 2024-01-01
    pub fn weekly_run_args() -> Vec<&'static str> {
        vec![
            "Run",
            "--every", "weekly",
            "--on", "mon,wed,fri",
            "--from", "07:00",
            "--to", "08:00",
            "--start", "2024-01-01",
        ]
    }

    /// Daily reading from 2024-01-01
    pub fn daily_read_args() -> Vec<&'static str> {
        vec!["Read", "--every", "daily", "--from", "9pm", "--start", "2024-01-01"]
    }
}

/// Utility functions for test assertions
pub mod assertions {
    use predicates::prelude::*;

    /// Predicate to check if output contains routine table headers
    pub fn has_routine_table_headers() -> impl Predicate<str> {
        predicate::str::contains("ID")
            .and(predicate::str::contains("Name"))
            .and(predicate::str::contains("Repeats"))
    }

    /// Predicate to check for error messages
    pub fn has_error() -> impl Predicate<str> {
        predicate::str::contains("Error").or(predicate::str::contains("error"))
    }
}
