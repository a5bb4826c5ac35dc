//! Document chunking and context windows.

pub mod chunker;
pub mod window;

pub use chunker::{chunk_document, rebuild_windows, split_chunks, Chunk, ChunkerConfig, RawChunk};
pub use window::{ContextWindow, ContextWindowBuilder, ProjectContext, WindowMode};
