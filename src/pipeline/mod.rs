//! Pipeline orchestration: configuration, per-stage state, and the
//! five-stage state machine.

pub mod config;
pub mod orchestrator;
pub mod state;

pub use config::PipelineConfig;
pub use orchestrator::{PipelineOrchestrator, PipelineOrchestratorBuilder};
pub use state::{ChunkedState, ExtractedState, FetchedState, RunRequest, SynthesizedState};
