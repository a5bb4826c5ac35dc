//! Document store and results cache seams, with in-memory implementations.
//!
//! Both handles are injected into the orchestrator; nothing in the crate
//! holds global state. The in-memory implementations back the tests and are
//! usable for embedding; real deployments implement the traits over their
//! own storage.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::ingestion::sync::SyncRecord;
use crate::payload::AnalysisArtifact;
use crate::types::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Processing,
    Completed,
    Failed,
}

/// One status transition for a document's analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: AnalysisStatus,
    pub stage: Option<Stage>,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl StatusUpdate {
    pub fn completed() -> Self {
        Self {
            status: AnalysisStatus::Completed,
            stage: None,
            error: None,
            updated_at: Utc::now(),
        }
    }

    pub fn failed(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            status: AnalysisStatus::Failed,
            stage: Some(stage),
            error: Some(message.into()),
            updated_at: Utc::now(),
        }
    }
}

/// Per-document persistence: analysis status and the ingestion sync record.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn update_status(
        &self,
        document_id: &str,
        update: StatusUpdate,
    ) -> Result<(), PipelineError>;

    async fn sync_record(&self, document_id: &str) -> Result<Option<SyncRecord>, PipelineError>;

    async fn put_sync_record(
        &self,
        document_id: &str,
        record: SyncRecord,
    ) -> Result<(), PipelineError>;

    /// Mirror a terminal status onto the upload metadata of a stored
    /// document. Called only for runs started from a document id; stores
    /// without upload metadata keep the default no-op.
    async fn update_upload_metadata(
        &self,
        _document_id: &str,
        _update: &StatusUpdate,
    ) -> Result<(), PipelineError> {
        Ok(())
    }
}

/// Completed-artifact cache keyed by document id.
#[async_trait]
pub trait ResultsCache: Send + Sync {
    async fn put(&self, document_id: &str, artifact: AnalysisArtifact)
        -> Result<(), PipelineError>;

    async fn get(&self, document_id: &str) -> Result<Option<AnalysisArtifact>, PipelineError>;
}

#[derive(Default)]
struct StoreInner {
    statuses: FxHashMap<String, Vec<StatusUpdate>>,
    sync_records: FxHashMap<String, SyncRecord>,
    upload_metadata: FxHashMap<String, StatusUpdate>,
}

/// In-memory [`DocumentStore`]. Keeps the full status history per document,
/// which the integration tests assert against.
#[derive(Default)]
pub struct MemoryDocumentStore {
    inner: Mutex<StoreInner>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every status update recorded for a document, oldest first.
    pub fn status_history(&self, document_id: &str) -> Vec<StatusUpdate> {
        self.inner
            .lock()
            .statuses
            .get(document_id)
            .cloned()
            .unwrap_or_default()
    }

    /// The latest status mirrored onto a stored document's upload metadata.
    pub fn upload_metadata(&self, document_id: &str) -> Option<StatusUpdate> {
        self.inner.lock().upload_metadata.get(document_id).cloned()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn update_status(
        &self,
        document_id: &str,
        update: StatusUpdate,
    ) -> Result<(), PipelineError> {
        self.inner
            .lock()
            .statuses
            .entry(document_id.to_owned())
            .or_default()
            .push(update);
        Ok(())
    }

    async fn sync_record(&self, document_id: &str) -> Result<Option<SyncRecord>, PipelineError> {
        Ok(self.inner.lock().sync_records.get(document_id).cloned())
    }

    async fn put_sync_record(
        &self,
        document_id: &str,
        record: SyncRecord,
    ) -> Result<(), PipelineError> {
        self.inner
            .lock()
            .sync_records
            .insert(document_id.to_owned(), record);
        Ok(())
    }

    async fn update_upload_metadata(
        &self,
        document_id: &str,
        update: &StatusUpdate,
    ) -> Result<(), PipelineError> {
        self.inner
            .lock()
            .upload_metadata
            .insert(document_id.to_owned(), update.clone());
        Ok(())
    }
}

/// In-memory [`ResultsCache`] with a fixed TTL. Stale entries are evicted
/// on read; there is no background sweeper.
pub struct MemoryResultsCache {
    ttl: Duration,
    entries: Mutex<FxHashMap<String, (Instant, AnalysisArtifact)>>,
}

impl MemoryResultsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(FxHashMap::default()),
        }
    }

    /// One-hour TTL, matching how long a finished analysis stays useful to
    /// a review UI before it should be re-read from canonical storage.
    pub fn with_default_ttl() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}

#[async_trait]
impl ResultsCache for MemoryResultsCache {
    async fn put(
        &self,
        document_id: &str,
        artifact: AnalysisArtifact,
    ) -> Result<(), PipelineError> {
        self.entries
            .lock()
            .insert(document_id.to_owned(), (Instant::now(), artifact));
        Ok(())
    }

    async fn get(&self, document_id: &str) -> Result<Option<AnalysisArtifact>, PipelineError> {
        let mut entries = self.entries.lock();
        match entries.get(document_id) {
            Some((inserted, artifact)) if inserted.elapsed() <= self.ttl => {
                Ok(Some(artifact.clone()))
            }
            Some(_) => {
                entries.remove(document_id);
                Ok(None)
            }
            None => Ok(None),
        }
    }
}
