//! Trigger events and concurrency grouping
//!
//! A [`Trigger`] is the event that starts one pipeline run: a change-request
//! update or a branch push. Triggers that must not run simultaneously share a
//! [`GroupKey`] — same workflow plus same change request (or branch, for
//! pushes).

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of event that fired the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A change request was opened or updated
    ChangeRequest,
    /// A branch was pushed to directly
    BranchPush,
}

/// The event that starts a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trigger {
    /// Workflow identity (e.g. "ci")
    pub workflow: String,

    /// What fired the pipeline
    pub event: EventKind,

    /// Change-request number, present for change-request events
    #[serde(default)]
    pub change_request: Option<u64>,

    /// Branch reference (e.g. "refs/heads/main")
    pub branch: String,
}

impl Trigger {
    /// Trigger for a change-request update
    pub fn change_request(
        workflow: impl Into<String>,
        number: u64,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            workflow: workflow.into(),
            event: EventKind::ChangeRequest,
            change_request: Some(number),
            branch: branch.into(),
        }
    }

    /// Trigger for a direct branch push
    pub fn branch_push(workflow: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            workflow: workflow.into(),
            event: EventKind::BranchPush,
            change_request: None,
            branch: branch.into(),
        }
    }

    /// The concurrency group this trigger belongs to.
    ///
    /// Two triggers are in the same group iff workflow identity and
    /// (change-request number if present, else branch ref) match.
    pub fn group_key(&self) -> GroupKey {
        let target = match self.change_request {
            Some(number) => format!("cr-{}", number),
            None => self.branch.clone(),
        };
        GroupKey {
            workflow: self.workflow.clone(),
            target,
        }
    }
}

/// Equivalence class of triggers that supersede each other
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    workflow: String,
    target: String,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.workflow, self.target)
    }
}
