//! Job executor - parallel fan-out over the external test runner
//!
//! All job specs of one run execute concurrently, bounded by the configured
//! parallelism. Jobs share nothing but their read-only spec and the run's
//! cancellation token, which is checked at the single suspension point:
//! before the external invocation (a tripped token means the job never
//! starts) and again after it returns (a late result of a superseded run is
//! discarded as Cancelled). A runner-level breakage becomes CrashedInfra and
//! never cancels sibling jobs.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, error, instrument};

use crate::bridge::TestRunner;
use crate::engine::result::JobResult;
use crate::engine::run::{CancelToken, PipelineRun};
use crate::workflow::matrix::JobSpec;

pub struct JobExecutor {
    runner: Arc<dyn TestRunner>,
    parallelism: usize,
}

impl JobExecutor {
    pub fn new(runner: Arc<dyn TestRunner>, parallelism: usize) -> Self {
        Self {
            runner,
            parallelism: parallelism.max(1),
        }
    }

    /// Run every spec to a terminal state and return all results.
    ///
    /// One result per spec, in no guaranteed order; the aggregator slots
    /// them back by index.
    #[instrument(skip(self, run, specs), fields(run_id = %run.id(), jobs = specs.len()))]
    pub async fn execute_all(&self, run: &PipelineRun, specs: Vec<JobSpec>) -> Vec<JobResult> {
        let semaphore = Arc::new(Semaphore::new(self.parallelism));
        let cancel = run.cancel_token();

        let futures: Vec<_> = specs
            .into_iter()
            .map(|spec| {
                let semaphore = semaphore.clone();
                let runner = self.runner.clone();
                let cancel = cancel.clone();

                async move {
                    let _permit = semaphore.acquire().await.unwrap();
                    execute_one(runner.as_ref(), &cancel, spec).await
                }
            })
            .collect();

        join_all(futures).await
    }
}

/// Run a single job spec to a terminal state.
async fn execute_one(runner: &dyn TestRunner, cancel: &CancelToken, spec: JobSpec) -> JobResult {
    if cancel.is_cancelled() {
        debug!(job = spec.label(), "cancelled before the runner was invoked");
        return JobResult::cancelled(spec);
    }

    let start = Instant::now();
    match runner.run_suite(&spec).await {
        Ok(summary) => {
            let duration = start.elapsed();
            if cancel.is_cancelled() {
                // The run was superseded while the suite ran; its numbers
                // no longer count either way.
                debug!(job = spec.label(), "discarding result of superseded run");
                return JobResult::cancelled(spec);
            }
            debug!(
                job = spec.label(),
                errors = summary.errors,
                failures = summary.failures,
                "job completed"
            );
            JobResult::completed(spec, summary, duration)
        }
        Err(e) => {
            let duration = start.elapsed();
            if cancel.is_cancelled() {
                return JobResult::cancelled(spec);
            }
            error!(
                job = spec.label(),
                error = %e,
                "test runner failed at the infrastructure level"
            );
            JobResult::crashed(spec, e.to_string(), duration)
        }
    }
}
