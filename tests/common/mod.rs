//! Shared fixtures for integration tests: scripted providers that stand in
//! for the document source, knowledge graph, ingestion service, and LLM.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use coordscribe::document::Document;
use coordscribe::error::PipelineError;
use coordscribe::providers::extractor::{GenerationParams, PromptKind, SemanticExtractor};
use coordscribe::providers::graph::{GraphContext, GraphContextProvider, GraphNode};
use coordscribe::providers::ingestor::{ChunkIngestRequest, VectorIngestor};
use coordscribe::providers::source::DocumentSource;
use coordscribe::types::{Coordinate, DocumentRef};

/// Serves inline references and nothing else.
pub struct InlineOnlySource;

#[async_trait]
impl DocumentSource for InlineOnlySource {
    async fn fetch(&self, reference: &DocumentRef) -> Result<Document, PipelineError> {
        match reference {
            DocumentRef::Inline { title, text } => {
                Ok(Document::new(format!("inline:{title}"), title.clone(), text))
            }
            other => Err(PipelineError::fetch(format!(
                "unsupported reference: {}",
                other.describe()
            ))),
        }
    }
}

/// Serves one stored document by id, as an upload-backed store would.
pub struct StoredDocSource {
    pub id: &'static str,
    pub title: &'static str,
    pub text: &'static str,
}

#[async_trait]
impl DocumentSource for StoredDocSource {
    async fn fetch(&self, reference: &DocumentRef) -> Result<Document, PipelineError> {
        match reference {
            DocumentRef::Id { id } if id == self.id => {
                Ok(Document::new(self.id, self.title, self.text))
            }
            other => Err(PipelineError::fetch(format!(
                "unknown reference: {}",
                other.describe()
            ))),
        }
    }
}

/// Returns a fixed neighborhood for any coordinate.
pub struct StaticGraph;

#[async_trait]
impl GraphContextProvider for StaticGraph {
    async fn relevant_subgraph(
        &self,
        target: &Coordinate,
        _depth: u8,
    ) -> Result<GraphContext, PipelineError> {
        Ok(GraphContext {
            focus: Some(GraphNode::new(target.as_str(), "Focus node")),
            parents: vec![GraphNode::new("#5", "Parent node")],
            ..Default::default()
        })
    }
}

/// Always fails; used to exercise the degraded-graph path.
pub struct FailingGraph;

#[async_trait]
impl GraphContextProvider for FailingGraph {
    async fn relevant_subgraph(
        &self,
        _target: &Coordinate,
        _depth: u8,
    ) -> Result<GraphContext, PipelineError> {
        Err(PipelineError::persistence("graph store offline"))
    }
}

/// Records every request; optionally fails them all.
#[derive(Default)]
pub struct RecordingIngestor {
    pub fail_all: bool,
    pub requests: Mutex<Vec<ChunkIngestRequest>>,
}

impl RecordingIngestor {
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl VectorIngestor for RecordingIngestor {
    async fn ingest_chunk(&self, request: &ChunkIngestRequest) -> Result<(), PipelineError> {
        self.requests.lock().push(request.clone());
        if self.fail_all {
            return Err(PipelineError::ingestion("ingestion service down"));
        }
        Ok(())
    }
}

/// Scripted LLM: per-kind response queues, with an optional per-kind
/// fallback used once a queue runs dry.
#[derive(Default)]
pub struct ScriptedExtractor {
    queues: Mutex<FxHashMap<PromptKind, VecDeque<Result<String, String>>>>,
    fallbacks: Mutex<FxHashMap<PromptKind, String>>,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, kind: PromptKind, response: impl Into<String>) {
        self.queues
            .lock()
            .entry(kind)
            .or_default()
            .push_back(Ok(response.into()));
    }

    pub fn push_failure(&self, kind: PromptKind, message: impl Into<String>) {
        self.queues
            .lock()
            .entry(kind)
            .or_default()
            .push_back(Err(message.into()));
    }

    pub fn always(&self, kind: PromptKind, response: impl Into<String>) {
        self.fallbacks.lock().insert(kind, response.into());
    }
}

#[async_trait]
impl SemanticExtractor for ScriptedExtractor {
    async fn generate(
        &self,
        kind: PromptKind,
        _system: &str,
        _user: &str,
        _params: GenerationParams,
    ) -> Result<String, PipelineError> {
        if let Some(next) = self.queues.lock().get_mut(&kind).and_then(VecDeque::pop_front) {
            return next.map_err(|message| PipelineError::extraction("scripted", message));
        }
        if let Some(fallback) = self.fallbacks.lock().get(&kind) {
            return Ok(fallback.clone());
        }
        Err(PipelineError::extraction(
            "scripted",
            format!("no scripted response for {kind:?}"),
        ))
    }
}

/// Three short paragraphs; with `chunk_size: 60, overlap: 0` they chunk to
/// exactly three chunks.
pub fn three_paragraph_text() -> &'static str {
    "Alpha opens with a recursive framing of the problem.\n\n\
     Beta develops the structural argument in detail.\n\n\
     Gamma closes by returning to the recursive frame."
}

pub fn scripted_extractor_arc() -> Arc<ScriptedExtractor> {
    Arc::new(ScriptedExtractor::new())
}
