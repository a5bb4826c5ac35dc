//! The LLM capability seam.
//!
//! Every model call in the pipeline goes through [`SemanticExtractor`]. The
//! trait carries a [`PromptKind`] so implementations can route call types to
//! different models, and [`GenerationParams`] so call sites control sampling.
//! An optional `rig-core`-backed implementation is available behind the
//! `llm` feature.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Which pipeline call is being made. Implementations may ignore this or use
/// it to select a model per call type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    /// Batched per-chunk semantic extraction.
    ChunkBatch,
    /// Whole-document extraction in single-unit mode.
    SingleUnit,
    /// Narrative synthesis over consolidated results.
    Synthesis,
    /// Core elements and relational properties.
    CoreElements,
    /// The final perspective narrative for the artifact.
    Perspective,
}

/// Sampling parameters for one generation call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f64,
    pub max_output_tokens: u64,
}

impl GenerationParams {
    /// Low-temperature settings for structured extraction calls.
    pub const ANALYTICAL: Self = Self {
        temperature: 0.2,
        max_output_tokens: 4096,
    };

    /// Same temperature, larger budget, for long-form synthesis output.
    pub const EXPANSIVE: Self = Self {
        temperature: 0.2,
        max_output_tokens: 8192,
    };
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self::ANALYTICAL
    }
}

/// Generates text from a system preamble and a user prompt.
#[async_trait]
pub trait SemanticExtractor: Send + Sync {
    async fn generate(
        &self,
        kind: PromptKind,
        system: &str,
        user: &str,
        params: GenerationParams,
    ) -> Result<String, PipelineError>;
}

/// `rig` completion-model adapter.
#[cfg(feature = "llm")]
pub struct RigExtractor<M> {
    model: M,
    provider: &'static str,
}

#[cfg(feature = "llm")]
impl<M> RigExtractor<M>
where
    M: rig::completion::CompletionModel,
{
    pub fn new(model: M, provider: &'static str) -> Self {
        Self { model, provider }
    }
}

#[cfg(feature = "llm")]
#[async_trait]
impl<M> SemanticExtractor for RigExtractor<M>
where
    M: rig::completion::CompletionModel + Send + Sync,
{
    async fn generate(
        &self,
        _kind: PromptKind,
        system: &str,
        user: &str,
        params: GenerationParams,
    ) -> Result<String, PipelineError> {
        let request = self
            .model
            .completion_request(rig::completion::Message::user(user.to_owned()))
            .preamble(system.to_owned())
            .temperature(params.temperature)
            .max_tokens(params.max_output_tokens)
            .build();

        let response = self
            .model
            .completion(request)
            .await
            .map_err(|e| PipelineError::extraction(self.provider, e.to_string()))?;

        let text = response
            .choice
            .into_iter()
            .filter_map(|content| match content {
                rig::message::AssistantContent::Text(t) => Some(t.text),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        if text.trim().is_empty() {
            return Err(PipelineError::extraction(
                self.provider,
                "model returned no text content".to_owned(),
            ));
        }
        Ok(text)
    }
}
