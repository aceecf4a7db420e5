use anyhow::{Context, Result};
use docflow_core::models::{EngineWorkflow, StagePayload};
use docflow_core::Config;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::time::Duration;

const MANAGEMENT_PREFIX: &str = "/api/v1";

/// Response from a webhook trigger. Any HTTP status is reported here; only
/// transport failures surface as errors, so callers can decide how to react
/// to a 404 (inactive workflow) or a 5xx.
#[derive(Debug, Clone)]
pub struct EngineResponse {
    pub status: u16,
    pub body: JsonValue,
}

impl EngineResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_workflow_missing(&self) -> bool {
        self.status == 404
    }
}

#[derive(Debug, Deserialize)]
struct WorkflowList {
    data: Vec<EngineWorkflow>,
}

/// HTTP client for the automation engine.
#[derive(Clone, Debug)]
pub struct EngineClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    api_timeout: Duration,
}

impl EngineClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.engine_webhook_timeout_secs()))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.engine_base_url().trim_end_matches('/').to_string(),
            api_key: config.engine_api_key().map(String::from),
            api_timeout: Duration::from_secs(config.engine_api_timeout_secs()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn management_url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, MANAGEMENT_PREFIX, path)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("X-Api-Key", key.as_str()),
            None => request,
        }
    }

    /// POST a stage payload to a webhook path. Returns the engine's status
    /// and parsed body regardless of the status code; a non-JSON body is
    /// wrapped as `{"raw": "..."}`.
    pub async fn trigger_webhook(
        &self,
        webhook_path: &str,
        payload: &StagePayload,
    ) -> Result<EngineResponse> {
        let url = self.build_url(webhook_path);
        let request = self.apply_auth(self.client.post(&url)).json(payload);

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to reach automation engine at {}", url))?;

        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let body = if text.is_empty() {
            JsonValue::Null
        } else {
            serde_json::from_str(&text).unwrap_or_else(|_| serde_json::json!({ "raw": text }))
        };

        tracing::debug!(webhook_path, status, "Engine webhook responded");
        Ok(EngineResponse { status, body })
    }

    /// List workflows via the management API, optionally filtered by
    /// active state.
    pub async fn list_workflows(&self, active: Option<bool>) -> Result<Vec<EngineWorkflow>> {
        let url = self.management_url("/workflows");
        let mut request = self
            .apply_auth(self.client.get(&url))
            .timeout(self.api_timeout);
        if let Some(active) = active {
            request = request.query(&[("active", active.to_string())]);
        }

        let response = request
            .send()
            .await
            .context("Failed to list engine workflows")?;
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!("Engine API returned {}: {}", status, error_text);
        }

        let list: WorkflowList = response
            .json()
            .await
            .context("Failed to parse workflow list")?;
        Ok(list.data)
    }

    pub async fn get_workflow(&self, workflow_id: &str) -> Result<Option<EngineWorkflow>> {
        let url = self.management_url(&format!("/workflows/{}", workflow_id));
        let response = self
            .apply_auth(self.client.get(&url))
            .timeout(self.api_timeout)
            .send()
            .await
            .context("Failed to get engine workflow")?;

        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!("Engine API returned {}: {}", status, error_text);
        }

        let workflow: EngineWorkflow = response
            .json()
            .await
            .context("Failed to parse workflow")?;
        Ok(Some(workflow))
    }

    /// Activate or deactivate a workflow.
    pub async fn set_workflow_active(&self, workflow_id: &str, active: bool) -> Result<()> {
        let action = if active { "activate" } else { "deactivate" };
        let url = self.management_url(&format!("/workflows/{}/{}", workflow_id, action));
        let response = self
            .apply_auth(self.client.post(&url))
            .timeout(self.api_timeout)
            .send()
            .await
            .with_context(|| format!("Failed to {} engine workflow", action))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!("Engine API returned {}: {}", status, error_text);
        }

        tracing::info!(workflow_id, action, "Workflow state changed");
        Ok(())
    }

    pub async fn workflow_is_active(&self, workflow_id: &str) -> Result<bool> {
        Ok(self
            .get_workflow(workflow_id)
            .await?
            .map(|w| w.active)
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(base: &str) -> EngineClient {
        EngineClient {
            client: Client::new(),
            base_url: base.trim_end_matches('/').to_string(),
            api_key: None,
            api_timeout: Duration::from_secs(10),
        }
    }

    #[test]
    fn test_webhook_url_building() {
        let client = test_client("http://localhost:5678/");
        assert_eq!(
            client.build_url("/webhook/document-analyzer"),
            "http://localhost:5678/webhook/document-analyzer"
        );
    }

    #[test]
    fn test_management_url_building() {
        let client = test_client("http://localhost:5678");
        assert_eq!(
            client.management_url("/workflows/42/activate"),
            "http://localhost:5678/api/v1/workflows/42/activate"
        );
    }

    #[test]
    fn test_response_classification() {
        let ok = EngineResponse {
            status: 200,
            body: JsonValue::Null,
        };
        let missing = EngineResponse {
            status: 404,
            body: JsonValue::Null,
        };
        let failing = EngineResponse {
            status: 500,
            body: JsonValue::Null,
        };
        assert!(ok.is_success());
        assert!(missing.is_workflow_missing());
        assert!(!failing.is_success());
        assert!(!failing.is_workflow_missing());
    }
}
