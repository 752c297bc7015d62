//! Execution result types

use std::fmt;
use std::time::Duration;

use crate::bridge::SuiteSummary;
use crate::engine::run::RunId;
use crate::workflow::config::InfraFailurePolicy;
use crate::workflow::matrix::JobSpec;

/// How a job ended
#[derive(Debug, Clone)]
pub enum CompletionState {
    /// The test runner returned a structured summary
    Completed(SuiteSummary),
    /// The owning run was superseded; the job never counts either way
    Cancelled,
    /// The runner itself broke: spawn failure, timeout, or a missing or
    /// unparsable summary. Never silently "zero failures".
    CrashedInfra(String),
}

/// Outcome of running one job spec; immutable once produced
#[derive(Debug, Clone)]
pub struct JobResult {
    spec: JobSpec,
    state: CompletionState,
    duration: Duration,
}

impl JobResult {
    pub fn completed(spec: JobSpec, summary: SuiteSummary, duration: Duration) -> Self {
        Self {
            spec,
            state: CompletionState::Completed(summary),
            duration,
        }
    }

    pub fn cancelled(spec: JobSpec) -> Self {
        Self {
            spec,
            state: CompletionState::Cancelled,
            duration: Duration::ZERO,
        }
    }

    pub fn crashed(spec: JobSpec, reason: impl Into<String>, duration: Duration) -> Self {
        Self {
            spec,
            state: CompletionState::CrashedInfra(reason.into()),
            duration,
        }
    }

    pub fn spec(&self) -> &JobSpec {
        &self.spec
    }

    pub fn state(&self) -> &CompletionState {
        &self.state
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn summary(&self) -> Option<&SuiteSummary> {
        match &self.state {
            CompletionState::Completed(summary) => Some(summary),
            _ => None,
        }
    }

    pub fn is_crashed(&self) -> bool {
        matches!(self.state, CompletionState::CrashedInfra(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.state, CompletionState::Cancelled)
    }
}

/// Pipeline-level summary over all job results of one run.
///
/// Built only once every job spec has a terminal result; read-only
/// thereafter. `jobs` is ordered by matrix declaration order for reporting.
#[derive(Debug, Clone)]
pub struct AggregateResult {
    pub run_id: RunId,
    pub errors: u64,
    pub failures: u64,
    pub crashed: usize,
    pub policy: InfraFailurePolicy,
    pub jobs: Vec<JobResult>,
}

impl AggregateResult {
    /// Whether infrastructure crashes block a success verdict under the
    /// applied policy
    pub fn has_blocking_crashes(&self) -> bool {
        self.crashed > 0 && self.policy == InfraFailurePolicy::Fail
    }

    /// Jobs that actually produced counts
    pub fn completed_count(&self) -> usize {
        self.jobs.iter().filter(|j| j.summary().is_some()).count()
    }
}

/// Final success/failure decision for a pipeline run; derived, never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Success,
    Failure,
}

impl Verdict {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
        }
    }
}
