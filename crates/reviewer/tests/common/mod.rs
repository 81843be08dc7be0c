//! Common test utilities for reviewer integration tests
#![allow(dead_code)]

use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

/// Isolated home directory plus a project tree to review
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub config_dir: PathBuf,
    pub project_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> anyhow::Result<Self> {
        let temp_dir = tempdir()?;
        let config_dir = temp_dir.path().join(".reviewer");
        let project_dir = temp_dir.path().join("project");

        std::fs::create_dir_all(&config_dir)?;
        std::fs::create_dir_all(&project_dir)?;

        Ok(Self {
            temp_dir,
            config_dir,
            project_dir,
        })
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.json")
    }

    pub fn project_file(&self, name: &str) -> PathBuf {
        self.project_dir.join(name)
    }

    /// Write a file into the project, creating parent directories
    pub fn write_project_file(&self, name: &str, content: &str) -> anyhow::Result<()> {
        let path = self.project_file(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Command with HOME pointed at the test environment and no ambient key
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_reviewer"));
        cmd.env("HOME", self.temp_dir.path());
        cmd.env_remove("REVIEWER_API_KEY");
        cmd.env_remove("RUST_LOG");
        cmd
    }

    /// Config pointing the Gemini provider at `api_base`
    pub fn create_config(&self, api_base: &str) -> anyhow::Result<()> {
        let config = serde_json::json!({
            "provider": {
                "kind": "gemini",
                "api_key": "test-api-key",
                "api_base": api_base,
                "model": "test-model"
            },
            "review": {
                "max_rounds": 5,
                "request_timeout_secs": 10,
                "max_retries": 0
            }
        });
        std::fs::write(self.config_file(), serde_json::to_string_pretty(&config)?)?;
        Ok(())
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new().expect("Failed to create test environment")
    }
}
