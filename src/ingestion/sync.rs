//! Ingestion sync records and the skip/re-ingest decision.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Coordinate;

/// Outcome of the most recent ingestion attempt for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionStatus {
    #[default]
    None,
    Processing,
    Completed,
    Failed,
    Skipped,
}

/// Persisted per document across runs by the [`crate::providers::DocumentStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRecord {
    pub status: IngestionStatus,
    pub target_coordinate: Coordinate,
    pub updated_at: DateTime<Utc>,
}

impl SyncRecord {
    pub fn new(status: IngestionStatus, target_coordinate: Coordinate) -> Self {
        Self {
            status,
            target_coordinate,
            updated_at: Utc::now(),
        }
    }
}

/// How long a completed ingestion stays fresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPolicy {
    pub max_age: Duration,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            max_age: Duration::hours(24),
        }
    }
}

/// Decides whether a document's chunks must be (re-)pushed to the vector
/// store. Pure: the decision depends only on its inputs, so repeated calls
/// with the same record and target always agree.
#[derive(Debug, Clone, Default)]
pub struct IngestionSyncGuard {
    policy: SyncPolicy,
}

impl IngestionSyncGuard {
    pub fn new(policy: SyncPolicy) -> Self {
        Self { policy }
    }

    /// Skip ingestion only when a prior run completed (or deliberately
    /// skipped) ingestion for the *same* coordinate recently enough. A
    /// missing record, a different coordinate, a non-terminal status, or a
    /// stale timestamp all mean: ingest again.
    pub fn needs_ingestion(
        &self,
        record: Option<&SyncRecord>,
        target: &Coordinate,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(record) = record else {
            return true;
        };
        if !matches!(
            record.status,
            IngestionStatus::Completed | IngestionStatus::Skipped
        ) {
            return true;
        }
        if record.target_coordinate != *target {
            return true;
        }
        now.signed_duration_since(record.updated_at) > self.policy.max_age
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: IngestionStatus, target: &str, age_hours: i64) -> SyncRecord {
        SyncRecord {
            status,
            target_coordinate: Coordinate::new(target),
            updated_at: Utc::now() - Duration::hours(age_hours),
        }
    }

    #[test]
    fn missing_record_requires_ingestion() {
        let guard = IngestionSyncGuard::default();
        assert!(guard.needs_ingestion(None, &Coordinate::new("#1"), Utc::now()));
    }

    #[test]
    fn fresh_completed_same_coordinate_skips() {
        let guard = IngestionSyncGuard::default();
        let rec = record(IngestionStatus::Completed, "#5-2", 1);
        assert!(!guard.needs_ingestion(Some(&rec), &Coordinate::new("#5-2"), Utc::now()));
        // Decision is stable across repeated calls.
        assert!(!guard.needs_ingestion(Some(&rec), &Coordinate::new("#5-2"), Utc::now()));
    }

    #[test]
    fn coordinate_normalization_makes_prefixless_targets_match() {
        let guard = IngestionSyncGuard::default();
        let rec = record(IngestionStatus::Completed, "5-2", 1);
        assert!(!guard.needs_ingestion(Some(&rec), &Coordinate::new("#5-2"), Utc::now()));
    }

    #[test]
    fn different_coordinate_reingests() {
        let guard = IngestionSyncGuard::default();
        let rec = record(IngestionStatus::Completed, "#5-2", 1);
        assert!(guard.needs_ingestion(Some(&rec), &Coordinate::new("#5-3"), Utc::now()));
    }

    #[test]
    fn non_terminal_statuses_reingest() {
        let guard = IngestionSyncGuard::default();
        for status in [
            IngestionStatus::None,
            IngestionStatus::Processing,
            IngestionStatus::Failed,
        ] {
            let rec = record(status, "#5-2", 1);
            assert!(guard.needs_ingestion(Some(&rec), &Coordinate::new("#5-2"), Utc::now()));
        }
    }

    #[test]
    fn skipped_counts_as_terminal() {
        let guard = IngestionSyncGuard::default();
        let rec = record(IngestionStatus::Skipped, "#5-2", 1);
        assert!(!guard.needs_ingestion(Some(&rec), &Coordinate::new("#5-2"), Utc::now()));
    }

    #[test]
    fn stale_records_reingest() {
        let guard = IngestionSyncGuard::default();
        let rec = record(IngestionStatus::Completed, "#5-2", 25);
        assert!(guard.needs_ingestion(Some(&rec), &Coordinate::new("#5-2"), Utc::now()));
    }
}
