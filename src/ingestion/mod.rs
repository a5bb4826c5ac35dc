//! Vector-store ingestion: the skip/re-ingest decision and the sequential
//! chunk push.

pub mod push;
pub mod sync;

pub use push::{ingest_request, push_chunks, IngestionReport};
pub use sync::{IngestionStatus, IngestionSyncGuard, SyncPolicy, SyncRecord};
