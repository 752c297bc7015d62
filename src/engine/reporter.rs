//! Reporter - change-request feedback
//!
//! Renders the aggregate into a markdown comment and submits it to the
//! reporting sink. Reporting is observational, not load-bearing: a sink
//! failure is logged and recorded in the outcome, never altering the
//! verdict.

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::{error, info};

use crate::bridge::ReportingSink;
use crate::engine::result::{AggregateResult, CompletionState, Verdict};

/// What happened to the report submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    /// The sink accepted the comment
    Submitted,
    /// No sink is configured
    Skipped,
    /// The sink was unreachable or rejected the comment
    Failed(String),
}

pub struct Reporter {
    sink: Option<Arc<dyn ReportingSink>>,
}

impl Reporter {
    pub fn new(sink: Option<Arc<dyn ReportingSink>>) -> Self {
        Self { sink }
    }

    /// Render the human-readable comment body.
    pub fn render(aggregate: &AggregateResult, verdict: Verdict) -> String {
        let mut body = String::new();

        let marker = if verdict.is_success() { "✓" } else { "✗" };
        let _ = writeln!(body, "## {} Test pipeline: {}", marker, verdict);
        let _ = writeln!(body);
        let _ = writeln!(
            body,
            "{} errors, {} failures across {} jobs.",
            aggregate.errors,
            aggregate.failures,
            aggregate.jobs.len()
        );
        let _ = writeln!(body);
        let _ = writeln!(body, "| job | status | errors | failures | duration |");
        let _ = writeln!(body, "|-----|--------|--------|----------|----------|");

        for job in &aggregate.jobs {
            let (status, errors, failures) = match job.state() {
                CompletionState::Completed(summary) => {
                    let status = if summary.errors == 0 && summary.failures == 0 {
                        "passed"
                    } else {
                        "failed"
                    };
                    (
                        status.to_string(),
                        summary.errors.to_string(),
                        summary.failures.to_string(),
                    )
                }
                CompletionState::Cancelled => {
                    ("cancelled".to_string(), "-".to_string(), "-".to_string())
                }
                CompletionState::CrashedInfra(reason) => (
                    format!("infrastructure failure: {}", reason),
                    "-".to_string(),
                    "-".to_string(),
                ),
            };
            let _ = writeln!(
                body,
                "| {} | {} | {} | {} | {:.1}s |",
                job.spec().label(),
                status,
                errors,
                failures,
                job.duration().as_secs_f64()
            );
        }

        let coverage: Vec<_> = aggregate
            .jobs
            .iter()
            .filter_map(|job| {
                job.summary()
                    .and_then(|s| s.coverage.as_ref())
                    .map(|cov| (job.spec().label(), cov))
            })
            .collect();
        if !coverage.is_empty() {
            let _ = writeln!(body);
            let _ = writeln!(body, "### Coverage");
            for (label, cov) in coverage {
                let _ = writeln!(body, "- {}: {}", label, cov);
            }
        }

        body
    }

    /// Format and submit the aggregate. Best-effort: failures degrade to
    /// "no comment posted".
    pub async fn report(&self, aggregate: &AggregateResult, verdict: Verdict) -> ReportOutcome {
        let sink = match &self.sink {
            Some(sink) => sink,
            None => return ReportOutcome::Skipped,
        };

        let body = Self::render(aggregate, verdict);
        match sink.publish(aggregate.run_id, &body).await {
            Ok(()) => {
                info!(run_id = %aggregate.run_id, "report submitted");
                ReportOutcome::Submitted
            }
            Err(e) => {
                error!(run_id = %aggregate.run_id, error = %e, "failed to submit report");
                ReportOutcome::Failed(e.to_string())
            }
        }
    }
}
