//! Trait seams for every external collaborator the pipeline talks to:
//! document source, knowledge graph, LLM, vector ingestion service,
//! document store, and results cache. The orchestrator owns none of these;
//! all are injected.

pub mod extractor;
pub mod graph;
pub mod ingestor;
pub mod source;
pub mod store;

pub use extractor::{GenerationParams, PromptKind, SemanticExtractor};
pub use graph::{GraphContext, GraphContextProvider, GraphNode};
pub use ingestor::{ChunkIngestRequest, HttpVectorIngestor, VectorIngestor};
pub use source::{DocumentSource, FileSource};
pub use store::{
    AnalysisStatus, DocumentStore, MemoryDocumentStore, MemoryResultsCache, ResultsCache,
    StatusUpdate,
};

#[cfg(feature = "llm")]
pub use extractor::RigExtractor;
