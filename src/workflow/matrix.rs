//! Environment matrix expansion
//!
//! Expands an ordered list of environment dimensions into concrete
//! [`JobSpec`]s — one per combination, in declaration order. Expansion is a
//! pure function of the configuration; the specs share no mutable state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::error::PipelineError;
use crate::engine::run::RunId;

/// One environment dimension: a named, ordered set of discrete values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentDimension {
    /// Dimension name (e.g. "python-version")
    pub name: String,

    /// Values, treated as opaque strings (e.g. "3.10", "3.11", "3.12")
    pub values: Vec<String>,
}

impl EnvironmentDimension {
    pub fn new(name: impl Into<String>, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// One unit of work: an environment combination bound to a pipeline run.
///
/// Immutable once created; ordering of the `index` field reflects the
/// declaration order of the matrix and is used for reporting only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    run_id: RunId,
    index: usize,
    env: BTreeMap<String, String>,
    label: String,
}

impl JobSpec {
    /// The run this job belongs to
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Position in the expanded matrix (declaration order)
    pub fn index(&self) -> usize {
        self.index
    }

    /// Dimension name → value for this combination
    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Human-readable label, e.g. "python-version=3.10"
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Expand the matrix into job specs — the cartesian product of all
/// dimensions, preserving declaration order.
///
/// For a single dimension of size k this produces exactly k specs. Fails
/// with a configuration error if the dimension list is empty or any
/// dimension has no values.
pub fn expand(
    run_id: RunId,
    dimensions: &[EnvironmentDimension],
) -> Result<Vec<JobSpec>, PipelineError> {
    if dimensions.is_empty() {
        return Err(PipelineError::Configuration(
            "matrix has no dimensions".to_string(),
        ));
    }
    for dim in dimensions {
        if dim.values.is_empty() {
            return Err(PipelineError::Configuration(format!(
                "matrix dimension '{}' has no values",
                dim.name
            )));
        }
    }

    // Cartesian product, first dimension varying slowest.
    let mut combos: Vec<Vec<(String, String)>> = vec![Vec::new()];
    for dim in dimensions {
        let mut next = Vec::with_capacity(combos.len() * dim.values.len());
        for combo in &combos {
            for value in &dim.values {
                let mut extended = combo.clone();
                extended.push((dim.name.clone(), value.clone()));
                next.push(extended);
            }
        }
        combos = next;
    }

    let specs = combos
        .into_iter()
        .enumerate()
        .map(|(index, pairs)| {
            let label = pairs
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join(", ");
            JobSpec {
                run_id,
                index,
                env: pairs.into_iter().collect(),
                label,
            }
        })
        .collect();

    Ok(specs)
}
