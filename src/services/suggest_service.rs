//! Column name/context suggester — an external, purely advisory collaborator.
//!
//! The pipeline must work identically when this provider is unconfigured,
//! slow, or broken; every call site treats a failure as "no suggestions".

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::config::SuggesterConfig;
use crate::errors::{PipelineError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSample {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default)]
    pub sample: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSuggestion {
    pub original_name: String,
    pub suggested_name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SuggestResponse {
    #[serde(default)]
    suggestions: Vec<ColumnSuggestion>,
}

#[async_trait]
pub trait ColumnSuggester: Send + Sync {
    async fn suggest(
        &self,
        description: Option<&str>,
        columns: &[ColumnSample],
        sample_data: &[serde_json::Value],
    ) -> Result<Vec<ColumnSuggestion>>;
}

/// HTTP-backed suggester, posting column samples to the configured provider.
pub struct HttpSuggester {
    client: reqwest::Client,
    config: SuggesterConfig,
}

impl HttpSuggester {
    pub fn new(config: SuggesterConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { client, config }
    }
}

#[async_trait]
impl ColumnSuggester for HttpSuggester {
    async fn suggest(
        &self,
        description: Option<&str>,
        columns: &[ColumnSample],
        sample_data: &[serde_json::Value],
    ) -> Result<Vec<ColumnSuggestion>> {
        let body = json!({
            "description": description,
            "columns": columns,
            "sampleData": sample_data,
        });

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Internal(format!("suggestion provider: {e}")))?;

        if !response.status().is_success() {
            return Err(PipelineError::Internal(format!(
                "suggestion provider returned {}",
                response.status()
            )));
        }

        let parsed: SuggestResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Internal(format!("suggestion payload: {e}")))?;

        debug!(count = parsed.suggestions.len(), "column suggestions received");
        Ok(parsed.suggestions)
    }
}

/// Stands in when no provider is configured; always suggests nothing.
pub struct NoopSuggester;

#[async_trait]
impl ColumnSuggester for NoopSuggester {
    async fn suggest(
        &self,
        _description: Option<&str>,
        _columns: &[ColumnSample],
        _sample_data: &[serde_json::Value],
    ) -> Result<Vec<ColumnSuggestion>> {
        Ok(Vec::new())
    }
}

pub fn suggester_from_config(config: Option<SuggesterConfig>) -> Box<dyn ColumnSuggester> {
    match config {
        Some(config) => Box::new(HttpSuggester::new(config)),
        None => Box::new(NoopSuggester),
    }
}
