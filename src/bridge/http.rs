//! HTTP reporting sink and status signal
//!
//! Both endpoints are keyed by run id and use PUT so that re-posting for
//! the same run updates rather than duplicates.

use async_trait::async_trait;
use serde_json::json;

use super::{ReportingSink, SinkError, StatusSignal};
use crate::engine::result::Verdict;
use crate::engine::run::RunId;
use crate::workflow::config::SinkSettings;

/// Posts change-request comments to `PUT {base}/runs/{run_id}/comment`
pub struct HttpReportingSink {
    client: reqwest::Client,
    base_url: String,
}

impl HttpReportingSink {
    pub fn new(settings: &SinkSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: settings.url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ReportingSink for HttpReportingSink {
    async fn publish(&self, run_id: RunId, body: &str) -> Result<(), SinkError> {
        let url = format!("{}/runs/{}/comment", self.base_url, run_id);
        let response = self
            .client
            .put(&url)
            .json(&json!({ "run_id": run_id.to_string(), "body": body }))
            .send()
            .await?;

        check_status(response).await
    }
}

/// Writes the verdict to `PUT {base}/runs/{run_id}/status`
pub struct HttpStatusSignal {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStatusSignal {
    pub fn new(settings: &SinkSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: settings.url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl StatusSignal for HttpStatusSignal {
    async fn publish(&self, run_id: RunId, verdict: Verdict) -> Result<(), SinkError> {
        let url = format!("{}/runs/{}/status", self.base_url, run_id);
        let response = self
            .client
            .put(&url)
            .json(&json!({
                "run_id": run_id.to_string(),
                "success": verdict.is_success(),
                "verdict": verdict.to_string(),
            }))
            .send()
            .await?;

        check_status(response).await
    }
}

async fn check_status(response: reqwest::Response) -> Result<(), SinkError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(SinkError::Http {
            status: status.as_u16(),
            message: response.text().await.unwrap_or_default(),
        })
    }
}
