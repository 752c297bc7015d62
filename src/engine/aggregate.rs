//! Result aggregation
//!
//! Pure, order-independent reduction of per-job results into one
//! [`AggregateResult`]. Completed results contribute their reported counts;
//! a crashed job contributes one synthetic failure under the `fail` policy
//! (a job that never produced numbers must not read as a pass); cancelled
//! jobs are excluded entirely. Aggregation refuses partial data: every job
//! spec must have a terminal result.

use tracing::warn;

use crate::engine::error::PipelineError;
use crate::engine::result::{AggregateResult, CompletionState, JobResult};
use crate::engine::run::RunId;
use crate::workflow::config::InfraFailurePolicy;
use crate::workflow::matrix::JobSpec;

pub struct ResultAggregator;

impl ResultAggregator {
    /// Combine all job results of one run.
    ///
    /// Commutative over the input order: results are slotted back into
    /// matrix declaration order by their spec index, so any permutation
    /// yields an identical aggregate. Fails with `IncompleteRun` when any
    /// spec lacks a result.
    pub fn aggregate(
        run_id: RunId,
        specs: &[JobSpec],
        results: Vec<JobResult>,
        policy: InfraFailurePolicy,
    ) -> Result<AggregateResult, PipelineError> {
        let total = specs.len();
        let mut slots: Vec<Option<JobResult>> = Vec::with_capacity(total);
        slots.resize_with(total, || None);

        for result in results {
            let spec = result.spec();
            if spec.run_id() != run_id {
                warn!(
                    expected = %run_id,
                    got = %spec.run_id(),
                    job = spec.label(),
                    "discarding result from a different run"
                );
                continue;
            }
            let index = spec.index();
            if index >= total || slots[index].is_some() {
                warn!(job = spec.label(), index, "discarding stray job result");
                continue;
            }
            slots[index] = Some(result);
        }

        let missing = slots.iter().filter(|slot| slot.is_none()).count();
        if missing > 0 {
            return Err(PipelineError::IncompleteRun {
                run_id,
                missing,
                total,
            });
        }

        let jobs: Vec<JobResult> = slots.into_iter().flatten().collect();

        let mut errors = 0u64;
        let mut failures = 0u64;
        let mut crashed = 0usize;

        for job in &jobs {
            match job.state() {
                CompletionState::Completed(summary) => {
                    errors += summary.errors;
                    failures += summary.failures;
                }
                CompletionState::CrashedInfra(_) => {
                    crashed += 1;
                    if policy == InfraFailurePolicy::Fail {
                        failures += 1;
                    }
                }
                CompletionState::Cancelled => {}
            }
        }

        Ok(AggregateResult {
            run_id,
            errors,
            failures,
            crashed,
            policy,
            jobs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::SuiteSummary;
    use crate::workflow::matrix::{expand, EnvironmentDimension};
    use std::time::Duration;

    fn specs(run_id: RunId, k: usize) -> Vec<JobSpec> {
        let values: Vec<String> = (0..k).map(|i| format!("v{}", i)).collect();
        let dims = [EnvironmentDimension::new("runtime", values)];
        expand(run_id, &dims).unwrap()
    }

    fn summary(errors: u64, failures: u64) -> SuiteSummary {
        SuiteSummary {
            errors,
            failures,
            ..Default::default()
        }
    }

    fn completed(spec: &JobSpec, errors: u64, failures: u64) -> JobResult {
        JobResult::completed(spec.clone(), summary(errors, failures), Duration::from_secs(1))
    }

    #[test]
    fn test_sums_completed_counts() {
        let run_id = RunId::new();
        let specs = specs(run_id, 3);
        let results = vec![
            completed(&specs[0], 0, 0),
            completed(&specs[1], 1, 2),
            completed(&specs[2], 0, 3),
        ];

        let aggregate =
            ResultAggregator::aggregate(run_id, &specs, results, InfraFailurePolicy::Fail).unwrap();

        assert_eq!(aggregate.errors, 1);
        assert_eq!(aggregate.failures, 5);
        assert_eq!(aggregate.crashed, 0);
        assert_eq!(aggregate.jobs.len(), 3);
    }

    #[test]
    fn test_order_independent() {
        let run_id = RunId::new();
        let specs = specs(run_id, 3);
        let make = |order: [usize; 3]| {
            let results = order
                .iter()
                .map(|&i| completed(&specs[i], i as u64, 2 * i as u64))
                .collect();
            ResultAggregator::aggregate(run_id, &specs, results, InfraFailurePolicy::Fail).unwrap()
        };

        let forward = make([0, 1, 2]);
        let backward = make([2, 1, 0]);
        let shuffled = make([1, 2, 0]);

        for other in [&backward, &shuffled] {
            assert_eq!(forward.errors, other.errors);
            assert_eq!(forward.failures, other.failures);
            let labels = |a: &AggregateResult| {
                a.jobs.iter().map(|j| j.spec().label().to_string()).collect::<Vec<_>>()
            };
            assert_eq!(labels(&forward), labels(other));
        }
    }

    #[test]
    fn test_crashed_job_adds_synthetic_failure() {
        let run_id = RunId::new();
        let specs = specs(run_id, 2);
        let results = vec![
            completed(&specs[0], 0, 0),
            JobResult::crashed(specs[1].clone(), "runner exited 137", Duration::from_secs(4)),
        ];

        let aggregate =
            ResultAggregator::aggregate(run_id, &specs, results, InfraFailurePolicy::Fail).unwrap();

        assert_eq!(aggregate.failures, 1);
        assert_eq!(aggregate.crashed, 1);
        assert!(aggregate.has_blocking_crashes());
    }

    #[test]
    fn test_exclude_policy_keeps_crashes_out_of_counts() {
        let run_id = RunId::new();
        let specs = specs(run_id, 2);
        let results = vec![
            completed(&specs[0], 0, 0),
            JobResult::crashed(specs[1].clone(), "no summary artifact", Duration::ZERO),
        ];

        let aggregate =
            ResultAggregator::aggregate(run_id, &specs, results, InfraFailurePolicy::Exclude)
                .unwrap();

        assert_eq!(aggregate.failures, 0);
        assert_eq!(aggregate.crashed, 1);
        assert!(!aggregate.has_blocking_crashes());
    }

    #[test]
    fn test_cancelled_jobs_excluded_from_counts() {
        let run_id = RunId::new();
        let specs = specs(run_id, 3);
        let results = vec![
            completed(&specs[0], 0, 0),
            JobResult::cancelled(specs[1].clone()),
            completed(&specs[2], 0, 1),
        ];

        let aggregate =
            ResultAggregator::aggregate(run_id, &specs, results, InfraFailurePolicy::Fail).unwrap();

        assert_eq!(aggregate.errors, 0);
        assert_eq!(aggregate.failures, 1);
        assert_eq!(aggregate.completed_count(), 2);
    }

    #[test]
    fn test_missing_result_is_incomplete_run() {
        let run_id = RunId::new();
        let specs = specs(run_id, 3);
        let results = vec![completed(&specs[0], 0, 0), completed(&specs[2], 0, 0)];

        let err = ResultAggregator::aggregate(run_id, &specs, results, InfraFailurePolicy::Fail)
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::IncompleteRun {
                missing: 1,
                total: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_result_from_other_run_is_discarded() {
        let run_id = RunId::new();
        let other_run = RunId::new();
        let own_specs = specs(run_id, 1);
        let stray = specs(other_run, 1);
        let results = vec![completed(&stray[0], 9, 9)];

        let err = ResultAggregator::aggregate(run_id, &own_specs, results, InfraFailurePolicy::Fail)
            .unwrap_err();

        assert!(matches!(err, PipelineError::IncompleteRun { .. }));
    }
}
