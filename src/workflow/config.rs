//! Pipeline configuration
//!
//! The operator-facing declarative surface, loaded from pipeline.yaml:
//!
//! ```yaml
//! name: ci
//! matrix:
//!   - name: python-version
//!     values: ["3.10", "3.11", "3.12"]
//! parallel: 3
//! on_infra_failure: fail
//!
//! runner:
//!   command: pytest
//!   args: ["-n", "auto", "--cov"]
//!   summary_file: .matrix-ci/summary-{python-version}.json
//!   timeout_secs: 1800
//!
//! report:
//!   url: "http://localhost:3000/api"
//! status:
//!   url: "http://localhost:3000/api"
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::matrix::EnvironmentDimension;
use crate::engine::error::PipelineError;

/// How a job that crashed at the infrastructure level counts toward the
/// verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InfraFailurePolicy {
    /// Each crashed job contributes one synthetic failure (default)
    #[default]
    Fail,
    /// Crashed jobs are flagged in the breakdown but excluded from the
    /// verdict
    Exclude,
}

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Workflow identity; also the default trigger workflow
    pub name: String,

    /// Environment dimensions to cross into jobs
    pub matrix: Vec<EnvironmentDimension>,

    /// Maximum jobs running concurrently
    #[serde(default = "default_parallel")]
    pub parallel: usize,

    /// Policy for jobs that crashed at the infrastructure level
    #[serde(default)]
    pub on_infra_failure: InfraFailurePolicy,

    /// How to invoke the external test runner
    pub runner: RunnerSettings,

    /// Reporting sink endpoint (change-request comments); optional
    #[serde(default)]
    pub report: Option<SinkSettings>,

    /// Status signal endpoint (merge gating); optional
    #[serde(default)]
    pub status: Option<SinkSettings>,
}

fn default_parallel() -> usize {
    4
}

impl PipelineConfig {
    /// Check the configuration without running anything.
    ///
    /// Catches what would otherwise abort a run before any job starts.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.name.trim().is_empty() {
            return Err(PipelineError::Configuration(
                "pipeline name is empty".to_string(),
            ));
        }
        if self.matrix.is_empty() {
            return Err(PipelineError::Configuration(
                "matrix has no dimensions".to_string(),
            ));
        }
        for dim in &self.matrix {
            if dim.values.is_empty() {
                return Err(PipelineError::Configuration(format!(
                    "matrix dimension '{}' has no values",
                    dim.name
                )));
            }
        }
        if self.runner.command.trim().is_empty() {
            return Err(PipelineError::Configuration(
                "runner command is empty".to_string(),
            ));
        }
        if self.parallel == 0 {
            return Err(PipelineError::Configuration(
                "parallel must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// External test runner invocation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerSettings {
    /// Executable to run for each job (resolved on PATH)
    pub command: String,

    /// Arguments; `{dimension-name}` placeholders are substituted with the
    /// job's matrix values
    #[serde(default)]
    pub args: Vec<String>,

    /// Extra environment variables for the runner process
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Working directory for the runner process
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Path to the structured summary artifact the runner writes; supports
    /// `{dimension-name}` placeholders. When absent, the summary is read
    /// from the last JSON line of the runner's stdout.
    #[serde(default)]
    pub summary_file: Option<String>,

    /// Wall-clock limit per job; exceeding it counts as an infrastructure
    /// failure
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    1800
}

/// Endpoint settings shared by the reporting sink and status signal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkSettings {
    /// Base URL of the sink API
    pub url: String,
}
