//! Failure gate - aggregate counts to verdict
//!
//! The verdict is driven by the counts the test runners *reported*, never by
//! any individual process exit status: a runner can exit zero while its
//! summary records failed cases, and the gate must catch that.

use crate::engine::result::{AggregateResult, Verdict};

pub struct FailureGate;

impl FailureGate {
    /// Success iff no errors, no failures, and no infrastructure crash that
    /// the policy counts against the run.
    pub fn decide(aggregate: &AggregateResult) -> Verdict {
        if aggregate.errors == 0 && aggregate.failures == 0 && !aggregate.has_blocking_crashes() {
            Verdict::Success
        } else {
            Verdict::Failure
        }
    }
}
