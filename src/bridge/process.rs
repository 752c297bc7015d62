//! Process test runner - spawns the external test command per job
//!
//! The configured command is resolved on PATH and spawned once per job with
//! the job's matrix values injected two ways: `{dimension-name}`
//! placeholders in arguments are substituted, and each value is exported as
//! a `MATRIX_*` environment variable. The structured summary is read from
//! the configured artifact file, or from the last JSON object line of
//! stdout when no artifact path is set.
//!
//! The summary is authoritative in both directions: a parsed summary wins
//! over a nonzero exit status, and a zero exit status without a summary is
//! still an infrastructure failure.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use super::{RunnerError, SuiteSummary, TestRunner};
use crate::workflow::config::RunnerSettings;
use crate::workflow::matrix::JobSpec;

pub struct ProcessTestRunner {
    settings: RunnerSettings,
}

impl ProcessTestRunner {
    pub fn new(settings: RunnerSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl TestRunner for ProcessTestRunner {
    async fn run_suite(&self, spec: &JobSpec) -> Result<SuiteSummary, RunnerError> {
        let program = which::which(&self.settings.command).map_err(|e| {
            RunnerError::StartupFailed(format!(
                "cannot resolve '{}': {}",
                self.settings.command, e
            ))
        })?;

        // A stale artifact from an earlier invocation must never stand in
        // for a crashed run's summary.
        let summary_path = self
            .settings
            .summary_file
            .as_ref()
            .map(|template| substitute(template, spec));
        if let Some(path) = &summary_path {
            let _ = tokio::fs::remove_file(path).await;
        }

        let mut cmd = Command::new(program);
        for arg in &self.settings.args {
            cmd.arg(substitute(arg, spec));
        }
        for (key, value) in &self.settings.env {
            cmd.env(key, value);
        }
        for (name, value) in spec.env() {
            cmd.env(matrix_env_name(name), value);
        }
        if let Some(dir) = &self.settings.working_dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        cmd.kill_on_drop(true);

        debug!(job = spec.label(), command = %self.settings.command, "invoking test runner");

        let limit = Duration::from_secs(self.settings.timeout_secs);
        let output = match timeout(limit, cmd.output()).await {
            Ok(result) => result?,
            Err(_) => return Err(RunnerError::Timeout(limit)),
        };

        if let Some(path) = summary_path {
            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| RunnerError::MissingSummary(format!("{}: {}", path, e)))?;
            return Ok(serde_json::from_str(&content)?);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        match extract_summary_line(&stdout) {
            Some(line) => Ok(serde_json::from_str(line)?),
            None if !output.status.success() => Err(RunnerError::Crashed(format!(
                "exit status {} with no summary in output",
                output.status
            ))),
            None => Err(RunnerError::MissingSummary(
                "no summary line in runner output".to_string(),
            )),
        }
    }
}

/// Replace `{dimension-name}` placeholders with the job's matrix values.
fn substitute(template: &str, spec: &JobSpec) -> String {
    let mut result = template.to_string();
    for (name, value) in spec.env() {
        result = result.replace(&format!("{{{}}}", name), value);
    }
    result
}

/// `python-version` → `MATRIX_PYTHON_VERSION`
fn matrix_env_name(dimension: &str) -> String {
    let upper: String = dimension
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("MATRIX_{}", upper)
}

/// Find the last line of output that is a JSON object.
///
/// Test runners interleave progress output with the final summary; only the
/// last object line counts.
fn extract_summary_line(stdout: &str) -> Option<&str> {
    let object_line = Regex::new(r"^\s*\{.*\}\s*$").ok()?;
    stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| object_line.is_match(line))
}
