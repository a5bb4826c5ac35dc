//! The five-stage pipeline state machine.
//!
//! Stages run strictly in sequence: `Fetch`, `ChunkAndSync`, `Extract`,
//! `Synthesize`, `GeneratePayload`. Whatever error escapes a stage is
//! wrapped with that stage's name, a `failed` status is persisted
//! best-effort, and the wrapped error is returned. On success the artifact
//! is cached and the status set to `completed`; persistence failures after
//! the artifact exists are logged, not raised.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::chunking::chunker::{chunk_document, rebuild_windows};
use crate::chunking::window::{ContextWindowBuilder, WindowMode};
use crate::consolidate::consolidate;
use crate::error::PipelineError;
use crate::extraction::batch::BatchExtractor;
use crate::ingestion::push::{push_chunks, IngestionReport};
use crate::ingestion::sync::{IngestionStatus, IngestionSyncGuard, SyncRecord};
use crate::payload::{AnalysisArtifact, PayloadGenerator};
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::state::{
    ChunkedState, ExtractedState, FetchedState, RunRequest, SynthesizedState,
};
use crate::providers::extractor::SemanticExtractor;
use crate::providers::graph::{GraphContext, GraphContextProvider};
use crate::providers::ingestor::VectorIngestor;
use crate::providers::source::DocumentSource;
use crate::providers::store::{
    DocumentStore, MemoryDocumentStore, MemoryResultsCache, ResultsCache, StatusUpdate,
};
use crate::synthesis::Synthesizer;
use crate::types::{DocumentRef, Stage};

pub struct PipelineOrchestrator {
    source: Arc<dyn DocumentSource>,
    graph: Arc<dyn GraphContextProvider>,
    ingestor: Arc<dyn VectorIngestor>,
    extractor: Arc<dyn SemanticExtractor>,
    store: Arc<dyn DocumentStore>,
    cache: Arc<dyn ResultsCache>,
    config: PipelineConfig,
}

impl std::fmt::Debug for PipelineOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineOrchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PipelineOrchestrator {
    pub fn builder() -> PipelineOrchestratorBuilder {
        PipelineOrchestratorBuilder::default()
    }

    /// Run the full pipeline for one document. Returns the validated
    /// artifact, or a single stage-qualified error.
    pub async fn run(&self, request: RunRequest) -> Result<AnalysisArtifact, PipelineError> {
        let run_id = Uuid::new_v4();
        info!(
            %run_id,
            target = %request.target_coordinate,
            reference = %request.reference.describe(),
            "pipeline run started"
        );

        let from_upload = matches!(&request.reference, DocumentRef::Id { .. });
        let mut document_id = match &request.reference {
            DocumentRef::Id { id } => Some(id.clone()),
            _ => None,
        };

        match self.run_stages(&request, &mut document_id).await {
            Ok(artifact) => {
                if let Some(id) = &document_id {
                    if let Err(err) = self.cache.put(id, artifact.clone()).await {
                        warn!(error = %err, "artifact produced but caching failed");
                    }
                    let update = StatusUpdate::completed();
                    if let Err(err) = self.store.update_status(id, update.clone()).await {
                        warn!(error = %err, "artifact produced but status write failed");
                    }
                    if from_upload {
                        if let Err(err) = self.store.update_upload_metadata(id, &update).await {
                            warn!(error = %err, "upload metadata could not be updated");
                        }
                    }
                }
                info!(%run_id, "pipeline run complete");
                Ok(artifact)
            }
            Err(err) => {
                let stage = err.stage();
                if let (Some(id), Some(stage)) = (&document_id, stage) {
                    let update = StatusUpdate::failed(stage, err.to_string());
                    if let Err(persist_err) = self.store.update_status(id, update.clone()).await {
                        warn!(error = %persist_err, "failure status could not be persisted");
                    }
                    if from_upload {
                        if let Err(persist_err) =
                            self.store.update_upload_metadata(id, &update).await
                        {
                            warn!(error = %persist_err, "upload metadata could not be updated");
                        }
                    }
                }
                warn!(%run_id, stage = ?stage, error = %err, "pipeline run failed");
                Err(err)
            }
        }
    }

    async fn run_stages(
        &self,
        request: &RunRequest,
        document_id: &mut Option<String>,
    ) -> Result<AnalysisArtifact, PipelineError> {
        let fetched = self
            .fetch_stage(request)
            .await
            .map_err(|e| e.at_stage(Stage::Fetch))?;
        *document_id = Some(fetched.document.id.clone());

        let chunked = self
            .chunk_and_sync_stage(request, fetched)
            .await
            .map_err(|e| e.at_stage(Stage::ChunkAndSync))?;
        let extracted = self
            .extract_stage(request, chunked)
            .await
            .map_err(|e| e.at_stage(Stage::Extract))?;
        let synthesized = self
            .synthesize_stage(extracted)
            .await
            .map_err(|e| e.at_stage(Stage::Synthesize))?;
        self.payload_stage(synthesized)
            .await
            .map_err(|e| e.at_stage(Stage::GeneratePayload))
    }

    async fn fetch_stage(&self, request: &RunRequest) -> Result<FetchedState, PipelineError> {
        let document = self.source.fetch(&request.reference).await?;
        if document.is_empty() {
            return Err(PipelineError::fetch(format!(
                "{} has no analyzable content",
                request.reference.describe()
            )));
        }
        info!(
            document = %document.id,
            words = document.word_count(),
            "document fetched"
        );
        Ok(FetchedState {
            document,
            target: request.target_coordinate.clone(),
        })
    }

    async fn chunk_and_sync_stage(
        &self,
        request: &RunRequest,
        fetched: FetchedState,
    ) -> Result<ChunkedState, PipelineError> {
        let graph = match self
            .graph
            .relevant_subgraph(&fetched.target, self.config.graph_depth)
            .await
        {
            Ok(graph) => graph,
            Err(err) => {
                warn!(error = %err, "graph context unavailable; continuing with empty context");
                GraphContext::default()
            }
        };

        let windows = ContextWindowBuilder::new(
            &fetched.document,
            fetched.target.clone(),
            request.project.clone(),
        )
        .with_graph(graph.clone());
        let chunks = chunk_document(
            &fetched.document,
            &self.config.chunker,
            &windows,
            WindowMode::Ingestion,
        )?;
        info!(chunks = chunks.len(), "document chunked");

        let guard = IngestionSyncGuard::new(self.config.sync.clone());
        let record = self.store.sync_record(&fetched.document.id).await?;
        let ingestion = if guard.needs_ingestion(record.as_ref(), &fetched.target, Utc::now()) {
            match push_chunks(self.ingestor.as_ref(), &chunks, &fetched.target).await {
                Ok(report) => {
                    self.store
                        .put_sync_record(
                            &fetched.document.id,
                            SyncRecord::new(IngestionStatus::Completed, fetched.target.clone()),
                        )
                        .await?;
                    report
                }
                Err(err) => {
                    let record =
                        SyncRecord::new(IngestionStatus::Failed, fetched.target.clone());
                    if let Err(persist_err) = self
                        .store
                        .put_sync_record(&fetched.document.id, record)
                        .await
                    {
                        warn!(error = %persist_err, "failed sync record could not be persisted");
                    }
                    return Err(err);
                }
            }
        } else {
            info!(document = %fetched.document.id, "ingestion skipped; sync record is fresh");
            IngestionReport::skipped()
        };

        Ok(ChunkedState {
            document: fetched.document,
            target: fetched.target,
            graph,
            chunks,
            ingestion,
        })
    }

    async fn extract_stage(
        &self,
        request: &RunRequest,
        chunked: ChunkedState,
    ) -> Result<ExtractedState, PipelineError> {
        let windows = ContextWindowBuilder::new(
            &chunked.document,
            chunked.target.clone(),
            request.project.clone(),
        )
        .with_graph(chunked.graph);
        let analysis_chunks = rebuild_windows(&chunked.chunks, &windows, WindowMode::Analysis)?;

        let extractor =
            BatchExtractor::new(self.extractor.clone(), self.config.extractor.clone());
        let results = extractor
            .extract(&analysis_chunks, &chunked.document, &chunked.target)
            .await?;
        let parse_failures = results.iter().filter(|r| r.is_error).count();
        info!(
            results = results.len(),
            parse_failures, "extraction complete"
        );

        Ok(ExtractedState {
            document: chunked.document,
            target: chunked.target,
            results,
            ingestion: chunked.ingestion,
        })
    }

    async fn synthesize_stage(
        &self,
        extracted: ExtractedState,
    ) -> Result<SynthesizedState, PipelineError> {
        let consolidated = consolidate(extracted.results);
        info!(
            mappings = consolidated.mappings.len(),
            variations = consolidated.variations.len(),
            tags = consolidated.tags.len(),
            "results consolidated"
        );

        let synthesizer = Synthesizer::new(self.extractor.clone());
        let synthesis = synthesizer
            .synthesize(&extracted.document, &consolidated, &extracted.target)
            .await?;

        Ok(SynthesizedState {
            document: extracted.document,
            target: extracted.target,
            consolidated,
            synthesis,
            ingestion: extracted.ingestion,
        })
    }

    async fn payload_stage(
        &self,
        synthesized: SynthesizedState,
    ) -> Result<AnalysisArtifact, PipelineError> {
        let generator = PayloadGenerator::new(self.extractor.clone());
        generator
            .generate(
                &synthesized.document,
                &synthesized.synthesis,
                &synthesized.consolidated,
                &synthesized.ingestion,
                &synthesized.target,
            )
            .await
    }
}

/// Assembles a [`PipelineOrchestrator`]. The document source, graph
/// provider, ingestor, and extractor are required; store and cache default
/// to the in-memory implementations.
#[derive(Default)]
pub struct PipelineOrchestratorBuilder {
    source: Option<Arc<dyn DocumentSource>>,
    graph: Option<Arc<dyn GraphContextProvider>>,
    ingestor: Option<Arc<dyn VectorIngestor>>,
    extractor: Option<Arc<dyn SemanticExtractor>>,
    store: Option<Arc<dyn DocumentStore>>,
    cache: Option<Arc<dyn ResultsCache>>,
    config: Option<PipelineConfig>,
}

impl PipelineOrchestratorBuilder {
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn DocumentSource>) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn with_graph(mut self, graph: Arc<dyn GraphContextProvider>) -> Self {
        self.graph = Some(graph);
        self
    }

    #[must_use]
    pub fn with_ingestor(mut self, ingestor: Arc<dyn VectorIngestor>) -> Self {
        self.ingestor = Some(ingestor);
        self
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: Arc<dyn SemanticExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn ResultsCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<PipelineOrchestrator, PipelineError> {
        let source = self
            .source
            .ok_or_else(|| PipelineError::configuration("document source is required"))?;
        let graph = self
            .graph
            .ok_or_else(|| PipelineError::configuration("graph context provider is required"))?;
        let ingestor = self
            .ingestor
            .ok_or_else(|| PipelineError::configuration("vector ingestor is required"))?;
        let extractor = self
            .extractor
            .ok_or_else(|| PipelineError::configuration("semantic extractor is required"))?;
        Ok(PipelineOrchestrator {
            source,
            graph,
            ingestor,
            extractor,
            store: self
                .store
                .unwrap_or_else(|| Arc::new(MemoryDocumentStore::new())),
            cache: self
                .cache
                .unwrap_or_else(|| Arc::new(MemoryResultsCache::with_default_ttl())),
            config: self.config.unwrap_or_default(),
        })
    }
}
