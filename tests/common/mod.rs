use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use matrix_ci::{
    JobSpec, PipelineConfig, ReportingSink, RunId, RunnerError, SinkError, StatusSignal,
    SuiteSummary, TestRunner, Verdict,
};
use tokio::sync::{mpsc, watch};

/// Pipeline config with a single runtime dimension; the runner settings are
/// inert because tests plug in their own TestRunner implementations.
pub fn test_config(values: &[&str]) -> PipelineConfig {
    let yaml = format!(
        r#"
name: ci
matrix:
  - name: runtime
    values: [{}]
runner:
  command: pytest
"#,
        values
            .iter()
            .map(|v| format!("\"{}\"", v))
            .collect::<Vec<_>>()
            .join(", ")
    );
    serde_yaml::from_str(&yaml).expect("test config must parse")
}

pub fn summary(errors: u64, failures: u64) -> SuiteSummary {
    SuiteSummary {
        errors,
        failures,
        ..Default::default()
    }
}

/// Runner that answers each environment value with a preset outcome.
pub struct StaticRunner {
    outcomes: HashMap<String, Result<SuiteSummary, String>>,
}

impl StaticRunner {
    pub fn new() -> Self {
        Self {
            outcomes: HashMap::new(),
        }
    }

    pub fn passing(mut self, value: &str) -> Self {
        self.outcomes
            .insert(value.to_string(), Ok(summary(0, 0)));
        self
    }

    pub fn reporting(mut self, value: &str, errors: u64, failures: u64) -> Self {
        self.outcomes
            .insert(value.to_string(), Ok(summary(errors, failures)));
        self
    }

    pub fn crashing(mut self, value: &str, reason: &str) -> Self {
        self.outcomes
            .insert(value.to_string(), Err(reason.to_string()));
        self
    }
}

#[async_trait]
impl TestRunner for StaticRunner {
    async fn run_suite(&self, spec: &JobSpec) -> Result<SuiteSummary, RunnerError> {
        let value = spec
            .env()
            .get("runtime")
            .cloned()
            .unwrap_or_default();
        match self.outcomes.get(&value) {
            Some(Ok(summary)) => Ok(summary.clone()),
            Some(Err(reason)) => Err(RunnerError::Crashed(reason.clone())),
            None => Ok(summary(0, 0)),
        }
    }
}

/// Runner whose invocations block until the test releases them; used to
/// hold a run in flight while a superseding trigger arrives.
pub struct GatedRunner {
    release: watch::Receiver<bool>,
    started: mpsc::UnboundedSender<String>,
}

impl GatedRunner {
    pub fn new() -> (Self, watch::Sender<bool>, mpsc::UnboundedReceiver<String>) {
        let (release_tx, release_rx) = watch::channel(false);
        let (started_tx, started_rx) = mpsc::unbounded_channel();
        (
            Self {
                release: release_rx,
                started: started_tx,
            },
            release_tx,
            started_rx,
        )
    }
}

#[async_trait]
impl TestRunner for GatedRunner {
    async fn run_suite(&self, spec: &JobSpec) -> Result<SuiteSummary, RunnerError> {
        let _ = self.started.send(spec.label().to_string());
        let mut release = self.release.clone();
        while !*release.borrow() {
            if release.changed().await.is_err() {
                break;
            }
        }
        Ok(summary(0, 0))
    }
}

/// Sink that records every published comment.
#[derive(Default)]
pub struct MemorySink {
    pub posts: Mutex<Vec<(RunId, String)>>,
}

impl MemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn posted_run_ids(&self) -> Vec<RunId> {
        self.posts.lock().unwrap().iter().map(|(id, _)| *id).collect()
    }
}

#[async_trait]
impl ReportingSink for MemorySink {
    async fn publish(&self, run_id: RunId, body: &str) -> Result<(), SinkError> {
        self.posts.lock().unwrap().push((run_id, body.to_string()));
        Ok(())
    }
}

/// Sink that is never reachable.
pub struct FailingSink;

#[async_trait]
impl ReportingSink for FailingSink {
    async fn publish(&self, _run_id: RunId, _body: &str) -> Result<(), SinkError> {
        Err(SinkError::Http {
            status: 503,
            message: "sink unreachable".to_string(),
        })
    }
}

/// Status signal that records every published verdict.
#[derive(Default)]
pub struct MemoryStatus {
    pub verdicts: Mutex<Vec<(RunId, Verdict)>>,
}

impl MemoryStatus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl StatusSignal for MemoryStatus {
    async fn publish(&self, run_id: RunId, verdict: Verdict) -> Result<(), SinkError> {
        self.verdicts.lock().unwrap().push((run_id, verdict));
        Ok(())
    }
}
