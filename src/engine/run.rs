//! Pipeline run identity, status, and cancellation
//!
//! A [`PipelineRun`] is one execution instance for a trigger. Its status
//! moves Pending → Running → one of {Cancelled, Succeeded, Failed}; terminal
//! states are never left. Cancellation is cooperative: the run's
//! [`CancelToken`] is checked by job executors at their suspension point,
//! never forced on already-started external work.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::workflow::trigger::GroupKey;

/// Unique identifier of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Pending,
    Running,
    Cancelled,
    Succeeded,
    Failed,
}

impl RunStatus {
    /// Terminal states are never left once entered
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Succeeded | Self::Failed)
    }

    /// A run is active while Pending or Running
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

/// Shared cancellation flag for one run, observed cooperatively
#[derive(Debug, Clone)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One execution instance for a trigger
#[derive(Debug)]
pub struct PipelineRun {
    id: RunId,
    group: GroupKey,
    created_at: DateTime<Utc>,
    cancel: CancelToken,
    status: Mutex<RunStatus>,
}

impl PipelineRun {
    pub(crate) fn new(group: GroupKey) -> Self {
        Self {
            id: RunId::new(),
            group,
            created_at: Utc::now(),
            cancel: CancelToken::new(),
            status: Mutex::new(RunStatus::Pending),
        }
    }

    pub fn id(&self) -> RunId {
        self.id
    }

    pub fn group(&self) -> &GroupKey {
        &self.group
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn status(&self) -> RunStatus {
        *self.status.lock().unwrap()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Move to `next` unless the run is already terminal. Returns whether
    /// the transition took effect.
    pub(crate) fn transition(&self, next: RunStatus) -> bool {
        let mut status = self.status.lock().unwrap();
        if status.is_terminal() {
            return false;
        }
        *status = next;
        true
    }

    /// Mark the run cancelled and trip its token.
    pub(crate) fn cancel(&self) {
        self.transition(RunStatus::Cancelled);
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::trigger::Trigger;

    fn group() -> GroupKey {
        Trigger::change_request("ci", 1, "refs/heads/main").group_key()
    }

    #[test]
    fn test_new_run_is_pending() {
        let run = PipelineRun::new(group());

        assert_eq!(run.status(), RunStatus::Pending);
        assert!(run.status().is_active());
        assert!(!run.is_cancelled());
    }

    #[test]
    fn test_terminal_states_are_sticky() {
        let run = PipelineRun::new(group());

        assert!(run.transition(RunStatus::Running));
        run.cancel();
        assert_eq!(run.status(), RunStatus::Cancelled);

        // A cancelled run can never become a success.
        assert!(!run.transition(RunStatus::Succeeded));
        assert_eq!(run.status(), RunStatus::Cancelled);
    }

    #[test]
    fn test_cancel_trips_the_shared_token() {
        let run = PipelineRun::new(group());
        let token = run.cancel_token();

        assert!(!token.is_cancelled());
        run.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_run_ids_are_unique() {
        let a = PipelineRun::new(group());
        let b = PipelineRun::new(group());

        assert_ne!(a.id(), b.id());
    }
}
