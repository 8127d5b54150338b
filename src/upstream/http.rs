//! HTTP analysis backend over a chat-completions style API.

use super::backend::AnalysisBackend;
use crate::{Error, Result};
use async_trait::async_trait;
use keyring::Entry;
use serde_json::json;
use std::env;
use std::time::Duration;
use uuid::Uuid;

/// Production backend: one POST to a chat-completions endpoint per batch.
pub struct HttpAnalysisBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl HttpAnalysisBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        // Minimal production-friendly defaults (env-overridable).
        let timeout_secs = env::var("RECALL_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(30);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: Self::get_api_key(),
        })
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    fn get_api_key() -> Option<String> {
        // 1. Try Keyring
        if let Ok(entry) = Entry::new("recall-dispatch", "analysis-service") {
            if let Ok(key) = entry.get_password() {
                return Some(key);
            }
        }

        // 2. Try Environment Variable
        env::var("RECALL_ANALYSIS_API_KEY").ok()
    }

    fn call_failure(message: impl Into<String>) -> Error {
        Error::UpstreamCallFailure {
            message: message.into(),
        }
    }
}

#[async_trait]
impl AnalysisBackend for HttpAnalysisBackend {
    async fn analyze(&self, payload: &str) -> Result<String> {
        let request_id = Uuid::new_v4().to_string();
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": payload }],
        });

        let url = format!("{}/v1/chat/completions", self.base_url);
        let mut req = self
            .client
            .post(&url)
            .json(&body)
            // Correlation id; the provider may ignore it.
            .header("x-recall-request-id", &request_id);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| Self::call_failure(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::call_failure(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let envelope: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Self::call_failure(e.to_string()))?;
        envelope["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| Self::call_failure("completion reply missing message content"))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
