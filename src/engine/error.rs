//! Pipeline error types

use crate::engine::run::RunId;
use crate::workflow::loader::LoadError;

/// Errors that can occur while orchestrating a pipeline run
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Invalid matrix or runner configuration; fatal before any job runs
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Aggregation was attempted before every job reached a terminal state.
    /// Indicates a scheduling bug; partial data is never reported as final.
    #[error("run {run_id}: {missing} of {total} jobs have no terminal result")]
    IncompleteRun {
        run_id: RunId,
        missing: usize,
        total: usize,
    },

    #[error("load error: {0}")]
    Load(#[from] LoadError),
}
