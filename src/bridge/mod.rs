//! Bridges to external collaborators
//!
//! The orchestration core depends on three seams, each a trait:
//! - `TestRunner` - executes the test suite for one environment and returns
//!   its structured summary
//! - `ReportingSink` - posts the formatted aggregate to the change request,
//!   idempotent per run id
//! - `StatusSignal` - receives the verdict consumed by merge gating

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::result::Verdict;
use crate::engine::run::RunId;
use crate::workflow::matrix::JobSpec;

pub mod http;
pub mod process;

pub use http::{HttpReportingSink, HttpStatusSignal};
pub use process::ProcessTestRunner;

/// Infrastructure-level failure of a test runner invocation.
///
/// These are distinct from reported test failures: a suite that ran and
/// reported failing cases is a Completed job; a runner that could not
/// produce a usable summary is a crashed one.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("failed to start test runner: {0}")]
    StartupFailed(String),

    #[error("test runner timed out after {0:?}")]
    Timeout(Duration),

    #[error("test runner exited abnormally: {0}")]
    Crashed(String),

    #[error("summary artifact missing: {0}")]
    MissingSummary(String),

    #[error("summary parse error: {0}")]
    InvalidSummary(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure to reach the reporting sink or status signal
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
}

/// Structured result blob produced by the test runner for one job
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuiteSummary {
    /// Collection/setup errors reported by the suite
    #[serde(default)]
    pub errors: u64,

    /// Failed test cases reported by the suite
    #[serde(default)]
    pub failures: u64,

    /// Total test cases, when the runner reports it
    #[serde(default)]
    pub tests: Option<u64>,

    /// Opaque coverage summary (e.g. lines missing), passed through to the
    /// report untouched
    #[serde(default)]
    pub coverage: Option<Value>,
}

/// Executes the test suite for one environment combination
#[async_trait]
pub trait TestRunner: Send + Sync {
    /// Run the suite for `spec` and return its structured summary.
    ///
    /// Returns an error only for infrastructure-level breakage; reported
    /// test failures belong in the summary.
    async fn run_suite(&self, spec: &JobSpec) -> Result<SuiteSummary, RunnerError>;
}

/// Posts feedback to the originating change request
#[async_trait]
pub trait ReportingSink: Send + Sync {
    /// Publish `body` for `run_id`. Idempotent per run id: re-posting
    /// updates the existing comment rather than duplicating it.
    async fn publish(&self, run_id: RunId, body: &str) -> Result<(), SinkError>;
}

/// Receives the final verdict, consumed by whatever gates merging
#[async_trait]
pub trait StatusSignal: Send + Sync {
    async fn publish(&self, run_id: RunId, verdict: Verdict) -> Result<(), SinkError>;
}
