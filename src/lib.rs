//! # coordscribe
//!
//! A staged document-analysis pipeline for coordinate-indexed knowledge
//! bases. A run fetches a document, chunks it with attached context
//! windows, pushes the chunks to a vector ingestion service (idempotently,
//! guarded by a per-document sync record), extracts semantic mappings in
//! batched LLM calls, consolidates the results across chunks, synthesizes
//! a narrative with core elements, and emits a validated artifact bound to
//! a target coordinate.
//!
//! ## Module Guide
//!
//! - [`types`]: coordinates, stages, document references
//! - [`error`]: the [`error::PipelineError`] taxonomy
//! - [`document`]: the document model and text normalization
//! - [`chunking`]: paragraph-first chunking and two-mode context windows
//! - [`providers`]: trait seams for every external collaborator
//! - [`ingestion`]: the sync guard and the sequential chunk push
//! - [`extraction`]: response schema, JSON recovery, the batch driver
//! - [`consolidate`]: cross-chunk mapping/variation/tag consolidation
//! - [`synthesis`]: narrative plus core elements, hard-validated
//! - [`payload`]: artifact assembly and completeness validation
//! - [`pipeline`]: configuration, per-stage state, the orchestrator
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use coordscribe::pipeline::{PipelineOrchestrator, RunRequest};
//! use coordscribe::providers::{FileSource, HttpVectorIngestor};
//! use coordscribe::types::DocumentRef;
//!
//! # async fn run(
//! #     graph: Arc<dyn coordscribe::providers::GraphContextProvider>,
//! #     extractor: Arc<dyn coordscribe::providers::SemanticExtractor>,
//! # ) -> Result<(), coordscribe::error::PipelineError> {
//! let orchestrator = PipelineOrchestrator::builder()
//!     .with_source(Arc::new(FileSource::new("./documents")))
//!     .with_graph(graph)
//!     .with_ingestor(Arc::new(HttpVectorIngestor::from_env()?))
//!     .with_extractor(extractor)
//!     .build()?;
//!
//! let request = RunRequest::new(
//!     DocumentRef::Path { path: "notes.md".into() },
//!     "#5-2",
//! );
//! let artifact = orchestrator.run(request).await?;
//! println!("{}", artifact.title);
//! # Ok(())
//! # }
//! ```

pub mod chunking;
pub mod consolidate;
pub mod document;
pub mod error;
pub mod extraction;
pub mod ingestion;
pub mod payload;
pub mod pipeline;
pub mod providers;
pub mod synthesis;
pub mod telemetry;
pub mod types;

pub use consolidate::{consolidate, Consolidated};
pub use document::Document;
pub use error::PipelineError;
pub use payload::{AnalysisArtifact, ContentBlock, PayloadGenerator};
pub use pipeline::{PipelineConfig, PipelineOrchestrator, RunRequest};
pub use synthesis::{CoreElement, RelationalProperties, SynthesisOutput, Synthesizer};
pub use types::{Coordinate, DocumentRef, Stage};
