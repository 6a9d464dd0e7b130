//! Seam between the sync layer and a generic keyed-record service.
//!
//! The service stores [`RemoteRecord`]s by `(record_type, key)`, answers
//! match-all queries sorted by one timestamp attribute, and keeps standing
//! change subscriptions that the platform turns into push signals.

use async_trait::async_trait;
use noticeboard_core::RemoteRecord;
use serde::{Deserialize, Serialize};

use crate::RemoteError;

/// Match-all query over one record type, sorted by a timestamp attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordQuery {
    pub record_type: String,
    pub sort_by: String,
    pub descending: bool,
}

impl RecordQuery {
    /// Every record of `record_type`, newest `sort_by` first.
    pub fn newest_first(record_type: &str, sort_by: &str) -> Self {
        Self {
            record_type: record_type.to_string(),
            sort_by: sort_by.to_string(),
            descending: true,
        }
    }
}

/// Result of a query: one entry per matched record. An entry is `Err` when
/// that single record could not be read; the rest of the batch still counts.
pub type QueryResults = Vec<Result<RemoteRecord, RemoteError>>;

/// Record changes a subscription fires on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
}

/// A standing change subscription on one record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub record_type: String,
    pub fires_on: Vec<ChangeKind>,
    /// Deliver as a background (content-available) signal with no alert.
    pub silent: bool,
}

impl Subscription {
    pub fn fires_on(&self, change: ChangeKind) -> bool {
        self.fires_on.contains(&change)
    }
}

/// Async operations offered by the remote keyed-record service.
///
/// Implementations hold at most an endpoint handle and are shared across
/// concurrent calls without extra locking by the caller.
#[async_trait]
pub trait RemoteDatabase: Send + Sync {
    /// Create or replace the record at `(record.record_type, record.key)`.
    async fn save_record(&self, record: RemoteRecord) -> Result<(), RemoteError>;

    /// Run a match-all query.
    async fn query_records(&self, query: &RecordQuery) -> Result<QueryResults, RemoteError>;

    /// Delete the record at `(record_type, key)`. Deleting a missing key
    /// succeeds.
    async fn delete_record(&self, record_type: &str, key: &str) -> Result<(), RemoteError>;

    /// Look up a subscription by id. `Ok(None)` when it does not exist.
    async fn fetch_subscription(&self, id: &str) -> Result<Option<Subscription>, RemoteError>;

    /// Create or replace a subscription.
    async fn save_subscription(&self, subscription: Subscription) -> Result<(), RemoteError>;
}
