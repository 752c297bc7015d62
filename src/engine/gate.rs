//! Concurrency gate - latest trigger wins
//!
//! Process-wide registry mapping each concurrency group to its active run.
//! Admitting a trigger cancels any run already active for the same group, so
//! two overlapping pushes or change-request updates never race to report a
//! stale verdict. All access to the registry is serialized behind a mutex;
//! the invariant is that at most one run per group is ever Pending/Running.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::engine::result::Verdict;
use crate::engine::run::{PipelineRun, RunStatus};
use crate::workflow::trigger::{GroupKey, Trigger};

/// Outcome of recording a finished run with the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The run was still the active one; its status was recorded
    Recorded,
    /// A newer trigger displaced this run while it executed; its result
    /// must be discarded
    Superseded,
}

/// Registry of active runs, one per concurrency group
#[derive(Debug, Default)]
pub struct ConcurrencyGate {
    active: Mutex<HashMap<GroupKey, Arc<PipelineRun>>>,
}

impl ConcurrencyGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a trigger: cancel any active run in its group and register a
    /// fresh Pending run as the group's active run.
    ///
    /// Cancellation is cooperative — the displaced run's executors observe
    /// the tripped token at job boundaries; external work already started is
    /// left to finish and its result discarded.
    pub fn admit(&self, trigger: &Trigger) -> Arc<PipelineRun> {
        let key = trigger.group_key();
        let run = Arc::new(PipelineRun::new(key.clone()));

        let mut active = self.active.lock().unwrap();
        if let Some(previous) = active.insert(key.clone(), run.clone()) {
            warn!(
                group = %key,
                superseded = %previous.id(),
                admitted = %run.id(),
                "newer trigger supersedes active run"
            );
            previous.cancel();
        } else {
            info!(group = %key, run_id = %run.id(), "admitted pipeline run");
        }

        run
    }

    /// Record a finished run. The status is written and the registry entry
    /// cleared only if the run is still the active one for its group;
    /// otherwise the caller must discard the result.
    pub fn finish(&self, run: &PipelineRun, verdict: Verdict) -> Completion {
        let mut active = self.active.lock().unwrap();
        let still_active = active
            .get(run.group())
            .is_some_and(|current| current.id() == run.id());

        if !still_active {
            debug!(run_id = %run.id(), "finished run was superseded; result discarded");
            return Completion::Superseded;
        }

        active.remove(run.group());
        drop(active);

        let status = if verdict.is_success() {
            RunStatus::Succeeded
        } else {
            RunStatus::Failed
        };
        run.transition(status);
        info!(run_id = %run.id(), verdict = %verdict, "recorded pipeline run");
        Completion::Recorded
    }

    /// The currently active run for a group, if any
    pub fn active_run(&self, key: &GroupKey) -> Option<Arc<PipelineRun>> {
        self.active.lock().unwrap().get(key).cloned()
    }

    /// Number of groups with an active run
    pub fn active_count(&self) -> usize {
        self.active.lock().unwrap().len()
    }
}
