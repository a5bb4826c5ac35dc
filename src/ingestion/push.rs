//! Sequential chunk push into the vector store.
//!
//! Chunks go out one at a time so the ingestion service is never hammered
//! and the per-chunk outcome is exact. Individual failures are tolerated;
//! a push where *every* chunk fails is a stage failure.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::chunking::chunker::Chunk;
use crate::error::PipelineError;
use crate::providers::ingestor::{ChunkIngestRequest, VectorIngestor};
use crate::types::Coordinate;

/// Exact accounting for one push.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestionReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: bool,
}

impl IngestionReport {
    /// The sync guard decided nothing needed pushing.
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Default::default()
        }
    }
}

/// Build the ingestion payload for one chunk: context window plus body as
/// the embeddable text, body alone as the stored text, and the target
/// coordinate first in the coordinate list.
pub fn ingest_request(chunk: &Chunk, target: &Coordinate) -> ChunkIngestRequest {
    let mut coordinates = vec![target.clone()];
    for coordinate in &chunk.window.coordinate_refs {
        if !coordinates.contains(coordinate) {
            coordinates.push(coordinate.clone());
        }
    }
    ChunkIngestRequest {
        chunk_text: format!("{}\n\n{}", chunk.window.context_text, chunk.text),
        original_text: chunk.text.clone(),
        coordinates,
    }
}

/// Push every chunk, sequentially, and report the outcome.
pub async fn push_chunks(
    ingestor: &dyn VectorIngestor,
    chunks: &[Chunk],
    target: &Coordinate,
) -> Result<IngestionReport, PipelineError> {
    let mut report = IngestionReport {
        attempted: chunks.len(),
        ..Default::default()
    };

    for chunk in chunks {
        let request = ingest_request(chunk, target);
        match ingestor.ingest_chunk(&request).await {
            Ok(()) => {
                report.succeeded += 1;
                debug!(chunk = chunk.index, "chunk ingested");
            }
            Err(err) => {
                report.failed += 1;
                warn!(chunk = chunk.index, error = %err, "chunk ingestion failed");
            }
        }
    }

    if report.succeeded == 0 && report.attempted > 0 {
        return Err(PipelineError::ingestion(format!(
            "all {} chunk ingestions failed",
            report.attempted
        )));
    }
    info!(
        succeeded = report.succeeded,
        failed = report.failed,
        "ingestion push complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::chunker::chunk_document;
    use crate::chunking::window::{ContextWindowBuilder, ProjectContext, WindowMode};
    use crate::chunking::ChunkerConfig;
    use crate::document::Document;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Fails every chunk whose text contains the marker.
    struct FlakyIngestor {
        fail_containing: &'static str,
        requests: Mutex<Vec<ChunkIngestRequest>>,
    }

    #[async_trait]
    impl VectorIngestor for FlakyIngestor {
        async fn ingest_chunk(&self, request: &ChunkIngestRequest) -> Result<(), PipelineError> {
            self.requests.lock().push(request.clone());
            if !self.fail_containing.is_empty()
                && request.original_text.contains(self.fail_containing)
            {
                return Err(PipelineError::ingestion("boom"));
            }
            Ok(())
        }
    }

    fn chunks() -> Vec<Chunk> {
        let text = format!("{}\n\n{}", "alpha ".repeat(30).trim_end(), "beta ".repeat(30).trim_end());
        let doc = Document::new("d1", "T", text);
        let windows = ContextWindowBuilder::new(
            &doc,
            Coordinate::new("#5-2"),
            ProjectContext::default(),
        );
        chunk_document(
            &doc,
            &ChunkerConfig {
                chunk_size: 150,
                overlap: 10,
            },
            &windows,
            WindowMode::Ingestion,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn reports_partial_failures_without_erroring() {
        let ingestor = FlakyIngestor {
            fail_containing: "beta",
            requests: Mutex::new(vec![]),
        };
        let chunks = chunks();
        let report = push_chunks(&ingestor, &chunks, &Coordinate::new("#5-2"))
            .await
            .unwrap();
        assert_eq!(report.attempted, chunks.len());
        assert!(report.succeeded >= 1);
        assert!(report.failed >= 1);
        assert_eq!(report.succeeded + report.failed, report.attempted);
    }

    #[tokio::test]
    async fn total_failure_is_an_ingestion_error() {
        let ingestor = FlakyIngestor {
            fail_containing: "a",
            requests: Mutex::new(vec![]),
        };
        let err = push_chunks(&ingestor, &chunks(), &Coordinate::new("#5-2"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Ingestion { .. }));
    }

    #[tokio::test]
    async fn requests_carry_target_first_and_context_text() {
        let ingestor = FlakyIngestor {
            fail_containing: "",
            requests: Mutex::new(vec![]),
        };
        let chunks = chunks();
        push_chunks(&ingestor, &chunks, &Coordinate::new("#5-2"))
            .await
            .unwrap();
        let requests = ingestor.requests.lock();
        assert_eq!(requests.len(), chunks.len());
        for (request, chunk) in requests.iter().zip(&chunks) {
            assert_eq!(request.coordinates[0], Coordinate::new("#5-2"));
            assert_eq!(request.original_text, chunk.text);
            assert!(request.chunk_text.ends_with(&chunk.text));
            assert!(request.chunk_text.len() > chunk.text.len());
        }
    }

    #[tokio::test]
    async fn empty_chunk_list_is_a_clean_noop() {
        let ingestor = FlakyIngestor {
            fail_containing: "",
            requests: Mutex::new(vec![]),
        };
        let report = push_chunks(&ingestor, &[], &Coordinate::new("#1"))
            .await
            .unwrap();
        assert_eq!(report.attempted, 0);
        assert_eq!(report.succeeded, 0);
    }
}
