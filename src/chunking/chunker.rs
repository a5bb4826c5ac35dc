//! Paragraph-first document chunking with word-tail overlap.
//!
//! Paragraphs (blank-line separated) are packed into chunks of roughly
//! `chunk_size` bytes. A paragraph that would overflow closes the current
//! chunk; the next chunk is seeded with the trailing `overlap / 5` words of
//! the closed one so retrieval never loses a sentence across a boundary.
//! A single paragraph larger than `chunk_size` becomes its own chunk,
//! unsplit.

use std::sync::Arc;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::chunking::window::{ContextWindow, ContextWindowBuilder, WindowMode};
use crate::document::Document;
use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Target chunk size in bytes.
    pub chunk_size: usize,
    /// Overlap budget in bytes; the seed carries `overlap / 5` words.
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

/// A chunk before its context window is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct RawChunk {
    pub index: usize,
    pub text: String,
    /// Byte offset of the first non-seed paragraph in the source document.
    pub start_offset: usize,
}

/// A chunk with its context window. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
    pub start_offset: usize,
    pub window: Arc<ContextWindow>,
}

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n").expect("paragraph pattern is valid"));

fn paragraphs_with_offsets(text: &str) -> Vec<(usize, &str)> {
    let mut parts = Vec::new();
    let mut last = 0;
    for sep in PARAGRAPH_BREAK.find_iter(text) {
        parts.push((last, &text[last..sep.start()]));
        last = sep.end();
    }
    parts.push((last, &text[last..]));
    parts.retain(|(_, p)| !p.trim().is_empty());
    parts
}

fn overlap_seed(chunk_text: &str, overlap: usize) -> String {
    if overlap == 0 {
        return String::new();
    }
    let take = (overlap / 5).max(1);
    let words: Vec<&str> = chunk_text.split_whitespace().collect();
    let start = words.len().saturating_sub(take);
    words[start..].join(" ")
}

/// Split text into raw chunks without building windows.
pub fn split_chunks(text: &str, config: &ChunkerConfig) -> Vec<RawChunk> {
    let mut chunks: Vec<RawChunk> = Vec::new();
    let mut current = String::new();
    let mut current_start = 0usize;
    // True while `current` holds at most seed text carried over from the
    // previous chunk.
    let mut seed_only = true;

    for (offset, raw_paragraph) in paragraphs_with_offsets(text) {
        let paragraph = raw_paragraph.trim();
        let projected = if current.is_empty() {
            paragraph.len()
        } else {
            current.len() + 2 + paragraph.len()
        };

        if projected > config.chunk_size && !seed_only {
            let seed = overlap_seed(&current, config.overlap);
            chunks.push(RawChunk {
                index: chunks.len(),
                text: std::mem::take(&mut current),
                start_offset: current_start,
            });
            current = seed;
            seed_only = true;
        }

        if seed_only {
            current_start = offset;
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
        seed_only = false;
    }

    if !seed_only && !current.trim().is_empty() {
        chunks.push(RawChunk {
            index: chunks.len(),
            text: current,
            start_offset: current_start,
        });
    }
    chunks
}

/// Chunk a document and attach a context window to every chunk. Any window
/// failure aborts the whole operation.
pub fn chunk_document(
    document: &Document,
    config: &ChunkerConfig,
    windows: &ContextWindowBuilder,
    mode: WindowMode,
) -> Result<Vec<Chunk>, PipelineError> {
    let raw = split_chunks(&document.text, config);
    if raw.is_empty() {
        return Err(PipelineError::chunking(format!(
            "document {} produced no chunks",
            document.id
        )));
    }
    raw.into_iter()
        .map(|chunk| {
            let window = windows.window(chunk.index, &chunk.text, chunk.start_offset, mode)?;
            Ok(Chunk {
                index: chunk.index,
                text: chunk.text,
                start_offset: chunk.start_offset,
                window,
            })
        })
        .collect()
}

/// Rebuild the same chunks with windows in a different mode. Used by the
/// extract stage to regenerate analysis windows over the ingestion-time
/// chunk extents.
pub fn rebuild_windows(
    chunks: &[Chunk],
    windows: &ContextWindowBuilder,
    mode: WindowMode,
) -> Result<Vec<Chunk>, PipelineError> {
    chunks
        .iter()
        .map(|chunk| {
            let window = windows.window(chunk.index, &chunk.text, chunk.start_offset, mode)?;
            Ok(Chunk {
                index: chunk.index,
                text: chunk.text.clone(),
                start_offset: chunk.start_offset,
                window,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::window::ProjectContext;
    use crate::types::Coordinate;

    fn config(chunk_size: usize, overlap: usize) -> ChunkerConfig {
        ChunkerConfig {
            chunk_size,
            overlap,
        }
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = split_chunks("one paragraph only", &ChunkerConfig::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "one paragraph only");
        assert_eq!(chunks[0].start_offset, 0);
    }

    #[test]
    fn overflow_closes_chunk_and_seeds_the_next() {
        let text = format!("{}\n\n{}", "alpha ".repeat(20).trim_end(), "beta paragraph");
        let chunks = split_chunks(&text, &config(100, 10));
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.starts_with("alpha"));
        // 10 / 5 = 2 seed words from the first chunk.
        assert!(chunks[1].text.starts_with("alpha alpha\n\nbeta paragraph"));
        assert_eq!(chunks[1].start_offset, text.find("beta").unwrap());
    }

    #[test]
    fn oversize_paragraph_stands_alone() {
        let big = "x".repeat(500);
        let text = format!("small one\n\n{big}\n\nsmall two");
        let chunks = split_chunks(&text, &config(100, 20));
        assert_eq!(chunks.len(), 3);
        assert!(chunks[1].text.ends_with(&big));
    }

    #[test]
    fn zero_overlap_produces_no_seed() {
        let text = format!("{}\n\n{}", "a".repeat(90), "b".repeat(90));
        let chunks = split_chunks(&text, &config(100, 0));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].text, "b".repeat(90));
    }

    #[test]
    fn blank_only_text_yields_nothing() {
        assert!(split_chunks("\n\n  \n\n", &ChunkerConfig::default()).is_empty());
    }

    #[test]
    fn chunk_document_attaches_windows_and_rejects_empty() {
        let doc = Document::new("d1", "T", "alpha\n\nbeta");
        let windows =
            ContextWindowBuilder::new(&doc, Coordinate::new("#1"), ProjectContext::default());
        let chunks =
            chunk_document(&doc, &ChunkerConfig::default(), &windows, WindowMode::Ingestion)
                .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].window.mode, WindowMode::Ingestion);

        let empty = Document::new("d2", "T", "   ");
        let windows =
            ContextWindowBuilder::new(&empty, Coordinate::new("#1"), ProjectContext::default());
        let err = chunk_document(&empty, &ChunkerConfig::default(), &windows, WindowMode::Ingestion)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Chunking { .. }));
    }

    #[test]
    fn rebuild_preserves_extents() {
        let doc = Document::new("d1", "T", "alpha\n\nbeta");
        let windows = ContextWindowBuilder::new(
            &doc,
            Coordinate::new("#1"),
            ProjectContext::default(),
        )
        .with_graph(Default::default());
        let chunks =
            chunk_document(&doc, &ChunkerConfig::default(), &windows, WindowMode::Ingestion)
                .unwrap();
        let rebuilt = rebuild_windows(&chunks, &windows, WindowMode::Analysis).unwrap();
        assert_eq!(rebuilt.len(), chunks.len());
        assert_eq!(rebuilt[0].text, chunks[0].text);
        assert_eq!(rebuilt[0].window.mode, WindowMode::Analysis);
    }
}
