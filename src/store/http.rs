//! HTTP client for a hosted document collection.

use super::DocumentStore;
use crate::types::analysis::CaptureDocument;
use crate::{Error, Result};
use async_trait::async_trait;
use keyring::Entry;
use std::env;
use std::time::Duration;

/// Inserts documents into a hosted collection over its REST API.
pub struct HttpDocumentStore {
    client: reqwest::Client,
    base_url: String,
    collection: String,
    api_key: Option<String>,
}

impl HttpDocumentStore {
    pub fn new(base_url: impl Into<String>, collection: impl Into<String>) -> Result<Self> {
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
            collection: collection.into(),
            api_key: Self::get_api_key(),
        })
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    fn get_api_key() -> Option<String> {
        if let Ok(entry) = Entry::new("recall-dispatch", "document-store") {
            if let Ok(key) = entry.get_password() {
                return Some(key);
            }
        }
        env::var("RECALL_STORE_API_KEY").ok()
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn insert(&self, doc: CaptureDocument) -> Result<()> {
        let url = format!(
            "{}/v1/collections/{}/documents",
            self.base_url, self.collection
        );
        let mut req = self.client.post(&url).json(&doc);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(|e| Error::PersistenceFailure {
            message: e.to_string(),
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::PersistenceFailure {
                message: format!("HTTP {}: {}", status.as_u16(), body),
            });
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
