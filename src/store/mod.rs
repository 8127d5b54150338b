//! 文档存储模块：托管文档库的插入目标抽象。
//!
//! # Document Store Module
//!
//! The hosted document store is an external collaborator the dispatcher only
//! ever inserts into; search and display belong to the client surfaces.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`DocumentStore`] | Trait seam for the insert target |
//! | [`MemoryStore`] | In-memory store for tests |
//! | [`HttpDocumentStore`] | Production client for a hosted collection API |

mod http;

use crate::types::analysis::CaptureDocument;
use crate::Result;
use async_trait::async_trait;
use std::sync::{Arc, RwLock};

pub use http::HttpDocumentStore;

/// Insert target for analyzed captures, one insert per successful item.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert(&self, doc: CaptureDocument) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// In-memory store for tests.
pub struct MemoryStore {
    docs: Arc<RwLock<Vec<CaptureDocument>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            docs: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn documents(&self) -> Vec<CaptureDocument> {
        self.docs.read().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.docs.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, doc: CaptureDocument) -> Result<()> {
        self.docs.write().unwrap().push(doc);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
