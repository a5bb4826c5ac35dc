//! Vector ingestion service client.
//!
//! Chunks are pushed one HTTP POST at a time to the ingestion service's
//! `/ingest` route. The payload pairs the context-enriched chunk text (what
//! gets embedded) with the original chunk text (what gets stored), plus the
//! coordinates the chunk should be indexed under.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::PipelineError;
use crate::types::Coordinate;

/// One chunk's ingestion payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkIngestRequest {
    /// Context window plus chunk body; this is the text that gets embedded.
    pub chunk_text: String,
    /// The chunk body alone, for verbatim retrieval.
    pub original_text: String,
    /// Normalized coordinates to index under; the run's target comes first.
    pub coordinates: Vec<Coordinate>,
}

/// Pushes one chunk into the vector store.
#[async_trait]
pub trait VectorIngestor: Send + Sync {
    async fn ingest_chunk(&self, request: &ChunkIngestRequest) -> Result<(), PipelineError>;
}

/// HTTP client for an ingestion service exposing `POST /ingest`.
#[derive(Debug, Clone)]
pub struct HttpVectorIngestor {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpVectorIngestor {
    pub fn new(base_url: &str) -> Result<Self, PipelineError> {
        let base = Url::parse(base_url)
            .map_err(|e| PipelineError::ingestion(format!("invalid ingestion URL {base_url}: {e}")))?;
        let endpoint = base
            .join("ingest")
            .map_err(|e| PipelineError::ingestion(format!("cannot derive ingest route: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| PipelineError::ingestion(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client, endpoint })
    }

    /// Read the endpoint from `COORDSCRIBE_INGEST_URL` (via `.env` when
    /// present), defaulting to `http://localhost:8001/`.
    pub fn from_env() -> Result<Self, PipelineError> {
        dotenvy::dotenv().ok();
        let base = std::env::var("COORDSCRIBE_INGEST_URL")
            .unwrap_or_else(|_| "http://localhost:8001/".to_owned());
        Self::new(&base)
    }
}

#[async_trait]
impl VectorIngestor for HttpVectorIngestor {
    async fn ingest_chunk(&self, request: &ChunkIngestRequest) -> Result<(), PipelineError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| PipelineError::ingestion(format!("ingest request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::ingestion(format!(
                "ingest endpoint returned {status}"
            )));
        }

        // Some deployments signal failure inside a 200 body.
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if body.get("status").and_then(Value::as_str) == Some("error") {
            let detail = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unspecified error");
            return Err(PipelineError::ingestion(format!(
                "ingest endpoint reported error: {detail}"
            )));
        }
        Ok(())
    }
}
