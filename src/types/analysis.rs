//! Structured analysis results and the persisted document shape.

use crate::types::request::{CaptureSource, PendingRequest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One structured result from the upstream analysis service.
///
/// The upstream reply is a JSON array of these, positionally matched to the
/// dispatched batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub emotions: Vec<String>,
    pub category: String,
    #[serde(default)]
    pub source_url: Option<String>,
}

impl Analysis {
    /// Drop a `source_url` the model produced that is not actually a URL.
    pub(crate) fn normalized(mut self) -> Self {
        if let Some(raw) = &self.source_url {
            if url::Url::parse(raw).is_err() {
                self.source_url = None;
            }
        }
        self
    }
}

/// Metadata payload persisted alongside each capture: the analysis fields
/// plus the original text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(flatten)]
    pub analysis: Analysis,
    pub raw_text: String,
}

/// Row shape inserted into the hosted document store, one per successfully
/// analyzed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureDocument {
    pub client_id: String,
    pub source: CaptureSource,
    pub created_at: DateTime<Utc>,
    pub metadata: DocumentMetadata,
}

impl CaptureDocument {
    pub(crate) fn from_request(req: &PendingRequest, analysis: Analysis) -> Self {
        Self {
            client_id: req.client_id.clone(),
            source: req.source,
            created_at: Utc::now(),
            metadata: DocumentMetadata {
                analysis,
                raw_text: req.text.clone(),
            },
        }
    }
}
