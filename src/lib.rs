//! # Matrix CI
//!
//! A CI test-pipeline orchestrator: it runs an automated test suite across
//! a declarative matrix of environment variants, aggregates per-job test
//! counts into a single verdict, and reports that verdict back to the
//! originating change request.
//!
//! ## Features
//!
//! - **Declarative YAML pipelines** - Matrix, runner, and sink configuration
//! - **Latest trigger wins** - A newer push or change-request update cancels
//!   the in-flight run for the same concurrency group
//! - **Parallel execution** - All matrix jobs run concurrently, bounded by
//!   the configured parallelism
//! - **Counts are authoritative** - The verdict is driven by reported test
//!   counts, never by a runner's raw exit status
//! - **Best-effort reporting** - An unreachable sink degrades to "no comment
//!   posted" without touching the verdict
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use matrix_ci::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load_file(Path::new("pipeline.yaml"))?;
//!     config.validate()?;
//!
//!     let runner = Arc::new(ProcessTestRunner::new(config.runner.clone()));
//!     let pipeline = Pipeline::new(config, runner);
//!
//!     let trigger = Trigger::change_request("ci", 42, "refs/heads/feature");
//!     let outcome = pipeline.run(trigger).await?;
//!
//!     println!("verdict: {:?}", outcome.verdict());
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod engine;
pub mod workflow;

// Re-export main types
pub use bridge::{
    HttpReportingSink, HttpStatusSignal, ProcessTestRunner, ReportingSink, RunnerError, SinkError,
    StatusSignal, SuiteSummary, TestRunner,
};
pub use engine::{
    AggregateResult, CancelToken, Completion, CompletionState, ConcurrencyGate, FailureGate,
    JobExecutor, JobResult, Pipeline, PipelineError, PipelineOutcome, PipelineRun, ReportOutcome,
    Reporter, ResultAggregator, RunId, RunStatus, Verdict,
};
pub use workflow::{
    expand, ConfigLoader, EnvironmentDimension, EventKind, GroupKey, InfraFailurePolicy, JobSpec,
    LoadError, PipelineConfig, RunnerSettings, SinkSettings, Trigger,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::bridge::{
        HttpReportingSink, HttpStatusSignal, ProcessTestRunner, ReportingSink, StatusSignal,
        SuiteSummary, TestRunner,
    };
    pub use crate::engine::{
        AggregateResult, ConcurrencyGate, Pipeline, PipelineError, PipelineOutcome, ReportOutcome,
        RunId, RunStatus, Verdict,
    };
    pub use crate::workflow::{
        ConfigLoader, EnvironmentDimension, EventKind, InfraFailurePolicy, JobSpec, PipelineConfig,
        Trigger,
    };
}
