//! Batched and single-unit extraction over chunks.
//!
//! Batched mode sends fixed-size groups of chunks in one call each and
//! expects a JSON array with one result object per chunk, in order. Index
//! alignment is the binding contract: short arrays are padded with error
//! placeholders, long arrays are truncated, and an unparseable response
//! yields a placeholder for every chunk in the batch. Only a provider
//! failure (transport, auth) aborts extraction.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::chunking::chunker::Chunk;
use crate::error::PipelineError;
use crate::extraction::parse::recover_json;
use crate::extraction::prompts;
use crate::extraction::schema::ExtractionResult;
use crate::providers::extractor::{GenerationParams, PromptKind, SemanticExtractor};
use crate::types::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    /// Fixed-size chunk batches, one call per batch.
    Batched,
    /// One call for the whole document.
    SingleUnit,
}

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub batch_size: usize,
    pub mode: ExtractionMode,
    pub params: GenerationParams,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            batch_size: 6,
            mode: ExtractionMode::Batched,
            params: GenerationParams::ANALYTICAL,
        }
    }
}

pub struct BatchExtractor {
    extractor: Arc<dyn SemanticExtractor>,
    config: ExtractorConfig,
}

impl BatchExtractor {
    pub fn new(extractor: Arc<dyn SemanticExtractor>, config: ExtractorConfig) -> Self {
        Self { extractor, config }
    }

    /// Run extraction over the chunks. In batched mode the output length
    /// always equals `chunks.len()`; in single-unit mode it is exactly one.
    pub async fn extract(
        &self,
        chunks: &[Chunk],
        document: &crate::document::Document,
        target: &Coordinate,
    ) -> Result<Vec<ExtractionResult>, PipelineError> {
        match self.config.mode {
            ExtractionMode::Batched => self.extract_batched(chunks, target).await,
            ExtractionMode::SingleUnit => self.extract_single_unit(chunks, document, target).await,
        }
    }

    async fn extract_batched(
        &self,
        chunks: &[Chunk],
        target: &Coordinate,
    ) -> Result<Vec<ExtractionResult>, PipelineError> {
        let batch_size = self.config.batch_size.max(1);
        let mut results = Vec::with_capacity(chunks.len());

        for (batch_no, batch) in chunks.chunks(batch_size).enumerate() {
            let (system, user) = prompts::batch_prompts(batch, target);
            let raw = self
                .extractor
                .generate(PromptKind::ChunkBatch, &system, &user, self.config.params)
                .await?;
            debug!(
                batch = batch_no,
                chunks = batch.len(),
                response_len = raw.len(),
                "batch extraction call complete"
            );
            results.extend(parse_batch(&raw, batch, target));
        }
        Ok(results)
    }

    async fn extract_single_unit(
        &self,
        chunks: &[Chunk],
        document: &crate::document::Document,
        target: &Coordinate,
    ) -> Result<Vec<ExtractionResult>, PipelineError> {
        let (system, user) = prompts::single_unit_prompts(document, chunks, target);
        let raw = self
            .extractor
            .generate(PromptKind::SingleUnit, &system, &user, self.config.params)
            .await?;
        let result = match recover_json(&raw) {
            Some(value) => ExtractionResult::from_value(value, 0, target),
            None => {
                warn!("single-unit response was not parseable JSON");
                ExtractionResult::error_placeholder(0, raw)
            }
        };
        Ok(vec![result])
    }
}

fn parse_batch(raw: &str, batch: &[Chunk], target: &Coordinate) -> Vec<ExtractionResult> {
    match recover_json(raw) {
        Some(serde_json::Value::Array(items)) => {
            if items.len() > batch.len() {
                warn!(
                    expected = batch.len(),
                    got = items.len(),
                    "batch response over-long; truncating"
                );
            }
            let mut items = items.into_iter();
            batch
                .iter()
                .map(|chunk| match items.next() {
                    Some(value) => ExtractionResult::from_value(value, chunk.index, target),
                    None => {
                        warn!(chunk = chunk.index, "batch response short; padding");
                        ExtractionResult::error_placeholder(
                            chunk.index,
                            "missing entry in batch response",
                        )
                    }
                })
                .collect()
        }
        // A bare object is acceptable for a single-chunk batch.
        Some(value) if batch.len() == 1 => {
            vec![ExtractionResult::from_value(value, batch[0].index, target)]
        }
        Some(_) | None => {
            warn!(
                chunks = batch.len(),
                "batch response unusable; emitting placeholders"
            );
            batch
                .iter()
                .map(|chunk| ExtractionResult::error_placeholder(chunk.index, raw))
                .collect()
        }
    }
}
