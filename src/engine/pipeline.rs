//! Pipeline coordinator
//!
//! Drives one trigger through the whole flow: admission at the concurrency
//! gate, matrix expansion, parallel job execution, aggregation, verdict,
//! status signal, and reporting. Configuration errors abort before any job
//! runs; a run superseded by a newer trigger is discarded without reporting.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::bridge::{ReportingSink, StatusSignal, TestRunner};
use crate::engine::aggregate::ResultAggregator;
use crate::engine::error::PipelineError;
use crate::engine::executor::JobExecutor;
use crate::engine::gate::{Completion, ConcurrencyGate};
use crate::engine::reporter::{ReportOutcome, Reporter};
use crate::engine::result::{AggregateResult, Verdict};
use crate::engine::run::{RunId, RunStatus};
use crate::engine::verdict::FailureGate;
use crate::workflow::config::PipelineConfig;
use crate::workflow::matrix::expand;
use crate::workflow::trigger::Trigger;

/// Result of driving one trigger through the pipeline
#[derive(Debug)]
pub enum PipelineOutcome {
    /// The run went to completion and its verdict was recorded
    Completed {
        run_id: RunId,
        verdict: Verdict,
        aggregate: AggregateResult,
        report: ReportOutcome,
    },
    /// A newer trigger for the same group displaced this run; its partial
    /// results were discarded
    Superseded { run_id: RunId },
}

impl PipelineOutcome {
    pub fn run_id(&self) -> RunId {
        match self {
            Self::Completed { run_id, .. } | Self::Superseded { run_id } => *run_id,
        }
    }

    pub fn verdict(&self) -> Option<Verdict> {
        match self {
            Self::Completed { verdict, .. } => Some(*verdict),
            Self::Superseded { .. } => None,
        }
    }
}

/// The orchestration core, wired to its external collaborators
pub struct Pipeline {
    config: PipelineConfig,
    gate: Arc<ConcurrencyGate>,
    executor: JobExecutor,
    reporter: Reporter,
    status: Option<Arc<dyn StatusSignal>>,
}

impl Pipeline {
    /// Create a pipeline with its own concurrency gate and no sinks
    pub fn new(config: PipelineConfig, runner: Arc<dyn TestRunner>) -> Self {
        let executor = JobExecutor::new(runner, config.parallel);
        Self {
            config,
            gate: Arc::new(ConcurrencyGate::new()),
            executor,
            reporter: Reporter::new(None),
            status: None,
        }
    }

    /// Share a concurrency gate with other pipelines (or callers that
    /// inspect it)
    pub fn with_gate(mut self, gate: Arc<ConcurrencyGate>) -> Self {
        self.gate = gate;
        self
    }

    /// Attach the reporting sink for change-request comments
    pub fn with_reporting_sink(mut self, sink: Arc<dyn ReportingSink>) -> Self {
        self.reporter = Reporter::new(Some(sink));
        self
    }

    /// Attach the status signal consumed by merge gating
    pub fn with_status_signal(mut self, status: Arc<dyn StatusSignal>) -> Self {
        self.status = Some(status);
        self
    }

    pub fn gate(&self) -> &Arc<ConcurrencyGate> {
        &self.gate
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Drive one trigger to a verdict.
    #[instrument(skip(self, trigger), fields(workflow = %trigger.workflow, group = %trigger.group_key()))]
    pub async fn run(&self, trigger: Trigger) -> Result<PipelineOutcome, PipelineError> {
        // Configuration errors are fatal before any run is admitted or any
        // job starts.
        self.config.validate()?;

        let run = self.gate.admit(&trigger);
        info!(run_id = %run.id(), "pipeline run admitted");

        let specs = expand(run.id(), &self.config.matrix)?;
        run.transition(RunStatus::Running);

        let results = self.executor.execute_all(&run, specs.clone()).await;

        if run.is_cancelled() {
            info!(run_id = %run.id(), "run superseded during execution; discarding results");
            return Ok(PipelineOutcome::Superseded { run_id: run.id() });
        }

        let aggregate = ResultAggregator::aggregate(
            run.id(),
            &specs,
            results,
            self.config.on_infra_failure,
        )?;
        let verdict = FailureGate::decide(&aggregate);

        if self.gate.finish(&run, verdict) == Completion::Superseded {
            return Ok(PipelineOutcome::Superseded { run_id: run.id() });
        }

        info!(
            run_id = %run.id(),
            %verdict,
            errors = aggregate.errors,
            failures = aggregate.failures,
            crashed = aggregate.crashed,
            "pipeline run finished"
        );

        // The status signal is what gates merging; a write failure is
        // logged, the verdict itself is already decided.
        if let Some(status) = &self.status {
            if let Err(e) = status.publish(run.id(), verdict).await {
                warn!(run_id = %run.id(), error = %e, "failed to publish status signal");
            }
        }

        let report = self.reporter.report(&aggregate, verdict).await;

        Ok(PipelineOutcome::Completed {
            run_id: run.id(),
            verdict,
            aggregate,
            report,
        })
    }
}
