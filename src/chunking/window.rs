//! Context windows attached to chunks.
//!
//! Two window modes exist. Ingestion windows are lightweight: document
//! overview, position description, and project context, kept small because
//! they are embedded alongside every chunk. Analysis windows add the
//! knowledge-graph neighborhood and structural notes, and are only built
//! when graph context was supplied. The builder caches windows per
//! `(chunk index, mode)`; an analysis window is never derived from an
//! ingestion window.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::PipelineError;
use crate::providers::graph::GraphContext;
use crate::types::{coordinate_refs, Coordinate};

const DOCUMENT_OVERVIEW_BUDGET: usize = 1200;
const CHUNK_PREVIEW_BUDGET: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    Ingestion,
    Analysis,
}

/// A bounded, immutable context window for one chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextWindow {
    pub mode: WindowMode,
    /// Prompt-ready context text.
    pub context_text: String,
    /// Rendered graph neighborhood; present only in analysis mode.
    pub graph_context: Option<String>,
    /// Coordinates relevant to this chunk: the run target first, then
    /// graph-mentioned and chunk-mentioned coordinates, deduplicated.
    pub coordinate_refs: Vec<Coordinate>,
}

/// Caller-supplied project framing included in every window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectContext {
    pub name: String,
    pub description: String,
}

impl ProjectContext {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Builds and caches context windows for one document and target coordinate.
pub struct ContextWindowBuilder {
    document_title: String,
    document_text: String,
    target: Coordinate,
    project: ProjectContext,
    graph: Option<GraphContext>,
    cache: Mutex<FxHashMap<(usize, WindowMode), Arc<ContextWindow>>>,
}

impl ContextWindowBuilder {
    pub fn new(document: &Document, target: Coordinate, project: ProjectContext) -> Self {
        Self {
            document_title: document.title.clone(),
            document_text: document.text.clone(),
            target,
            project,
            graph: None,
            cache: Mutex::new(FxHashMap::default()),
        }
    }

    /// Attach graph context. Required before any analysis-mode window can be
    /// built; an empty context is accepted and renders as "no neighborhood".
    #[must_use]
    pub fn with_graph(mut self, graph: GraphContext) -> Self {
        self.graph = Some(graph);
        self
    }

    /// Build (or fetch from cache) the window for one chunk.
    pub fn window(
        &self,
        chunk_index: usize,
        chunk_text: &str,
        start_offset: usize,
        mode: WindowMode,
    ) -> Result<Arc<ContextWindow>, PipelineError> {
        if let Some(cached) = self.cache.lock().get(&(chunk_index, mode)) {
            return Ok(Arc::clone(cached));
        }

        if mode == WindowMode::Analysis && self.graph.is_none() {
            return Err(PipelineError::chunking(format!(
                "analysis window for chunk {chunk_index} requires graph context for {}",
                self.target
            )));
        }

        let window = Arc::new(self.build(chunk_index, chunk_text, start_offset, mode));
        self.cache
            .lock()
            .insert((chunk_index, mode), Arc::clone(&window));
        Ok(window)
    }

    fn build(
        &self,
        chunk_index: usize,
        chunk_text: &str,
        start_offset: usize,
        mode: WindowMode,
    ) -> ContextWindow {
        let percent = position_percent(start_offset, self.document_text.len());
        let descriptor = position_descriptor(percent);

        let mut text = String::new();
        text.push_str(&format!("Document: {}\n", self.document_title));
        if !self.project.name.is_empty() {
            text.push_str(&format!(
                "Project: {}. {}\n",
                self.project.name, self.project.description
            ));
        }
        text.push_str(&format!("Target coordinate: {}\n", self.target));
        text.push_str(&format!(
            "Position: chunk {}, {descriptor} of the document (~{percent}%)\n",
            chunk_index + 1
        ));
        text.push_str("\nDocument overview:\n");
        text.push_str(&smart_truncate(&self.document_text, DOCUMENT_OVERVIEW_BUDGET));
        text.push_str("\n\nChunk preview:\n");
        text.push_str(&smart_truncate(chunk_text, CHUNK_PREVIEW_BUDGET));

        let graph_context = match mode {
            WindowMode::Analysis => {
                let rendered = self
                    .graph
                    .as_ref()
                    .map(|g| g.render())
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| "(no neighborhood available)\n".to_owned());
                text.push_str("\n\nKnowledge graph neighborhood:\n");
                text.push_str(&rendered);
                Some(rendered)
            }
            WindowMode::Ingestion => None,
        };

        let mut refs = vec![self.target.clone()];
        if let Some(graph) = &self.graph {
            for coordinate in graph.mentioned_coordinates() {
                if !refs.contains(&coordinate) {
                    refs.push(coordinate);
                }
            }
        }
        for coordinate in coordinate_refs(chunk_text) {
            if !refs.contains(&coordinate) {
                refs.push(coordinate);
            }
        }

        ContextWindow {
            mode,
            context_text: text,
            graph_context,
            coordinate_refs: refs,
        }
    }
}

fn position_percent(start_offset: usize, document_len: usize) -> usize {
    if document_len == 0 {
        return 0;
    }
    (start_offset.min(document_len) * 100) / document_len
}

fn position_descriptor(percent: usize) -> &'static str {
    match percent {
        0..=9 => "beginning",
        10..=32 => "early part",
        33..=65 => "middle",
        66..=89 => "later part",
        _ => "end",
    }
}

/// Truncate on a paragraph boundary when one falls in the second half of the
/// budget, then a sentence boundary, then a hard cut on a char boundary.
pub(crate) fn smart_truncate(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_owned();
    }
    let mut cut = max_bytes;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    let head = &text[..cut];
    let floor = max_bytes / 2;

    if let Some(pos) = head.rfind("\n\n") {
        if pos >= floor {
            return format!("{}...", head[..pos].trim_end());
        }
    }
    let sentence_end = [". ", "! ", "? "]
        .iter()
        .filter_map(|pat| head.rfind(pat).map(|i| i + 1))
        .max();
    if let Some(pos) = sentence_end {
        if pos >= floor {
            return format!("{}...", head[..pos].trim_end());
        }
    }
    format!("{}...", head.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::graph::GraphNode;

    fn builder_with_graph() -> ContextWindowBuilder {
        let doc = Document::new("d1", "Field Notes", "alpha\n\nbeta\n\ngamma");
        let graph = GraphContext {
            focus: Some(GraphNode::new("#5-2", "Process lens")),
            direct: vec![GraphNode::new("#5-2-1", "Intake")],
            ..Default::default()
        };
        ContextWindowBuilder::new(&doc, Coordinate::new("#5-2"), ProjectContext::default())
            .with_graph(graph)
    }

    #[test]
    fn modes_are_cached_under_separate_keys() {
        let builder = builder_with_graph();
        let ingest = builder.window(0, "alpha", 0, WindowMode::Ingestion).unwrap();
        let analysis = builder.window(0, "alpha", 0, WindowMode::Analysis).unwrap();
        assert_ne!(ingest.mode, analysis.mode);
        assert!(analysis.graph_context.is_some());
        assert!(ingest.graph_context.is_none());

        let again = builder.window(0, "alpha", 0, WindowMode::Ingestion).unwrap();
        assert!(Arc::ptr_eq(&ingest, &again));
    }

    #[test]
    fn analysis_without_graph_is_an_error() {
        let doc = Document::new("d1", "T", "body text");
        let builder =
            ContextWindowBuilder::new(&doc, Coordinate::new("#1"), ProjectContext::default());
        assert!(builder.window(0, "body text", 0, WindowMode::Ingestion).is_ok());
        let err = builder
            .window(0, "body text", 0, WindowMode::Analysis)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Chunking { .. }));
    }

    #[test]
    fn coordinate_refs_start_with_target_then_graph_then_chunk() {
        let builder = builder_with_graph();
        let window = builder
            .window(0, "refers to #9-9", 0, WindowMode::Analysis)
            .unwrap();
        assert_eq!(
            window.coordinate_refs,
            vec![
                Coordinate::new("#5-2"),
                Coordinate::new("#5-2-1"),
                Coordinate::new("#9-9"),
            ]
        );
    }

    #[test]
    fn position_buckets() {
        assert_eq!(position_descriptor(0), "beginning");
        assert_eq!(position_descriptor(15), "early part");
        assert_eq!(position_descriptor(50), "middle");
        assert_eq!(position_descriptor(80), "later part");
        assert_eq!(position_descriptor(95), "end");
    }

    #[test]
    fn smart_truncate_prefers_paragraph_breaks() {
        let text = format!("{}\n\n{}", "a".repeat(80), "b".repeat(80));
        let cut = smart_truncate(&text, 100);
        assert_eq!(cut, format!("{}...", "a".repeat(80)));
    }

    #[test]
    fn smart_truncate_falls_back_to_sentences_then_hard_cut() {
        let text = format!("{}. {}", "a".repeat(70), "b".repeat(70));
        let cut = smart_truncate(&text, 100);
        assert_eq!(cut, format!("{}....", "a".repeat(70)));

        let unbroken = "x".repeat(200);
        let cut = smart_truncate(&unbroken, 50);
        assert_eq!(cut.len(), 53);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn smart_truncate_respects_char_boundaries() {
        let text = "é".repeat(100);
        let cut = smart_truncate(&text, 51);
        assert!(cut.ends_with("..."));
    }
}
