//! Pipeline error taxonomy.
//!
//! Every fallible operation in the crate returns [`PipelineError`]. The
//! orchestrator wraps whatever escapes a stage in
//! [`PipelineError::StageFailed`], so callers always see a single
//! stage-qualified error. Extraction *parse* failures never appear here;
//! they are absorbed as inline placeholder results
//! (see [`crate::extraction::ExtractionResult::error_placeholder`]).

use miette::Diagnostic;
use thiserror::Error;

use crate::types::Stage;

#[derive(Debug, Error, Diagnostic)]
pub enum PipelineError {
    /// The document could not be retrieved or has no analyzable content.
    #[error("fetch failed: {message}")]
    #[diagnostic(
        code(coordscribe::fetch),
        help("Check the document reference and that the source is reachable.")
    )]
    Fetch { message: String },

    /// Chunking or context-window construction failed.
    #[error("chunking failed: {message}")]
    #[diagnostic(code(coordscribe::chunking))]
    Chunking { message: String },

    /// The vector ingestion push failed for every chunk, or the endpoint
    /// rejected a request outright.
    #[error("ingestion failed: {message}")]
    #[diagnostic(
        code(coordscribe::ingestion),
        help("Verify the ingestion endpoint URL and that the service is running.")
    )]
    Ingestion { message: String },

    /// The extraction provider itself failed (transport, auth, quota).
    #[error("extraction provider error ({provider}): {message}")]
    #[diagnostic(code(coordscribe::extraction))]
    Extraction {
        provider: &'static str,
        message: String,
    },

    /// Synthesis produced no usable narrative or no core elements.
    #[error("synthesis failed: {message}")]
    #[diagnostic(
        code(coordscribe::synthesis),
        help("Inspect the raw model response; the synthesis calls are hard-validated.")
    )]
    Synthesis { message: String },

    /// The assembled artifact failed completeness validation.
    #[error("payload validation failed: {message}")]
    #[diagnostic(code(coordscribe::payload_validation))]
    PayloadValidation { message: String },

    /// A document-store or results-cache operation failed.
    #[error("persistence failed: {message}")]
    #[diagnostic(code(coordscribe::persistence))]
    Persistence { message: String },

    /// The orchestrator was assembled without a required collaborator.
    #[error("configuration error: {message}")]
    #[diagnostic(
        code(coordscribe::config),
        help("Supply every required provider before calling build().")
    )]
    Configuration { message: String },

    /// JSON serialization error outside the lenient extraction path.
    #[error(transparent)]
    #[diagnostic(code(coordscribe::serde_json))]
    Serde(#[from] serde_json::Error),

    /// A stage-qualified wrapper produced only by the orchestrator.
    #[error("stage {stage} failed: {source}")]
    #[diagnostic(code(coordscribe::stage_failed))]
    StageFailed {
        stage: Stage,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    pub fn fetch(message: impl Into<String>) -> Self {
        Self::Fetch {
            message: message.into(),
        }
    }

    pub fn chunking(message: impl Into<String>) -> Self {
        Self::Chunking {
            message: message.into(),
        }
    }

    pub fn ingestion(message: impl Into<String>) -> Self {
        Self::Ingestion {
            message: message.into(),
        }
    }

    pub fn extraction(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Extraction {
            provider,
            message: message.into(),
        }
    }

    pub fn synthesis(message: impl Into<String>) -> Self {
        Self::Synthesis {
            message: message.into(),
        }
    }

    pub fn payload(message: impl Into<String>) -> Self {
        Self::PayloadValidation {
            message: message.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Wrap this error with the stage it escaped from. Idempotent: an error
    /// already stage-qualified keeps its original stage.
    #[must_use]
    pub fn at_stage(self, stage: Stage) -> Self {
        match self {
            already @ Self::StageFailed { .. } => already,
            other => Self::StageFailed {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage this error is attributed to, if it has been qualified.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
