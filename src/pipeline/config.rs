//! Pipeline configuration.

use crate::chunking::ChunkerConfig;
use crate::extraction::batch::ExtractorConfig;
use crate::ingestion::sync::SyncPolicy;

/// Everything tunable about a pipeline, with working defaults.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub chunker: ChunkerConfig,
    pub extractor: ExtractorConfig,
    pub sync: SyncPolicy,
    /// How many relation hops the graph provider should follow.
    pub graph_depth: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunker: ChunkerConfig::default(),
            extractor: ExtractorConfig::default(),
            sync: SyncPolicy::default(),
            graph_depth: 2,
        }
    }
}
