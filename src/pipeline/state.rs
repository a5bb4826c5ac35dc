//! Minimal per-stage state.
//!
//! Each stage consumes exactly one of these structs and returns the next;
//! nothing accumulates beyond what the following stage reads. This keeps
//! stage boundaries auditable and prevents the grab-bag state drift that
//! long pipelines tend toward.

use crate::chunking::chunker::Chunk;
use crate::chunking::window::ProjectContext;
use crate::consolidate::Consolidated;
use crate::document::Document;
use crate::extraction::schema::ExtractionResult;
use crate::ingestion::push::IngestionReport;
use crate::providers::graph::GraphContext;
use crate::synthesis::SynthesisOutput;
use crate::types::{Coordinate, DocumentRef};

/// What a caller supplies to start a run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub reference: DocumentRef,
    pub target_coordinate: Coordinate,
    pub project: ProjectContext,
}

impl RunRequest {
    pub fn new(reference: DocumentRef, target_coordinate: impl Into<Coordinate>) -> Self {
        Self {
            reference,
            target_coordinate: target_coordinate.into(),
            project: ProjectContext::default(),
        }
    }

    #[must_use]
    pub fn with_project(mut self, project: ProjectContext) -> Self {
        self.project = project;
        self
    }
}

/// Output of `Fetch`; input to `ChunkAndSync`.
#[derive(Debug, Clone)]
pub struct FetchedState {
    pub document: Document,
    pub target: Coordinate,
}

/// Output of `ChunkAndSync`; input to `Extract`. Carries the graph context
/// so the extract stage can rebuild analysis windows over the same chunk
/// extents.
#[derive(Debug, Clone)]
pub struct ChunkedState {
    pub document: Document,
    pub target: Coordinate,
    pub graph: GraphContext,
    pub chunks: Vec<Chunk>,
    pub ingestion: IngestionReport,
}

/// Output of `Extract`; input to `Synthesize`. The ingestion report rides
/// through to the artifact properties.
#[derive(Debug, Clone)]
pub struct ExtractedState {
    pub document: Document,
    pub target: Coordinate,
    pub results: Vec<ExtractionResult>,
    pub ingestion: IngestionReport,
}

/// Output of `Synthesize`; input to `GeneratePayload`.
#[derive(Debug, Clone)]
pub struct SynthesizedState {
    pub document: Document,
    pub target: Coordinate,
    pub consolidated: Consolidated,
    pub synthesis: SynthesisOutput,
    pub ingestion: IngestionReport,
}
