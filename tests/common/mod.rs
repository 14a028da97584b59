//! Common test utilities for axiom integration tests
//!
//! - CLI invocation through `assert_cmd` with an isolated config directory
//! - Fixture files in a temporary directory

#![allow(dead_code)]

use std::path::PathBuf;

use assert_cmd::Command;
use tempfile::TempDir;

/// A dummy URL that should never be resolved
pub const DUMMY_URL: &str = "http://this-should.never-resolve";

/// Isolated config directory plus scratch space for fixtures
pub struct TestEnv {
    pub dir: TempDir,
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// The axiom binary, reading config from this environment only
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("axiom").expect("axiom binary not built");
        cmd.env("AXIOM_CONFIG_DIR", self.dir.path());
        cmd.env_remove("AXIOM_LOG");
        cmd.args(["--timeout", "2s"]);
        cmd
    }

    /// Write a fixture file and return its path
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).expect("Failed to write fixture");
        path
    }

    pub fn write_json(&self, name: &str, value: &serde_json::Value) -> PathBuf {
        self.write(name, &serde_json::to_string_pretty(value).expect("Failed to serialize fixture"))
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

/// Strip ANSI color codes
pub fn strip_colors(s: &str) -> String {
    let re = regex::Regex::new(r"\x1b\[[0-9;]*m").expect("valid regex");
    re.replace_all(s, "").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_colors() {
        assert_eq!(strip_colors("\x1b[38;5;71mOK\x1b[0m"), "OK");
    }
}
