//! In-process remote store for tests and offline runs.
//!
//! Behaves like the real keyed-record service: create-or-replace by key,
//! idempotent delete, sorted match-all queries, and standing subscriptions
//! that emit a [`PushSignal`] on every matching change. Failures can be
//! injected per operation.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use noticeboard_core::{RecordValue, RemoteRecord};
use tokio::sync::broadcast;
use tracing::debug;

use crate::RemoteError;
use crate::push::PushSignal;
use crate::remote::{ChangeKind, QueryResults, RecordQuery, RemoteDatabase, Subscription};

const SIGNAL_CAPACITY: usize = 64;

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    SaveRecord,
    QueryRecords,
    DeleteRecord,
    FetchSubscription,
    SaveSubscription,
}

#[derive(Default)]
struct Inner {
    records: BTreeMap<(String, String), RemoteRecord>,
    subscriptions: BTreeMap<String, Subscription>,
    pending_failures: Vec<Operation>,
    offline: bool,
    calls: HashMap<Operation, usize>,
}

pub struct MemoryDatabase {
    inner: Mutex<Inner>,
    signals: broadcast::Sender<PushSignal>,
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDatabase {
    pub fn new() -> Self {
        let (signals, _) = broadcast::channel(SIGNAL_CAPACITY);
        Self {
            inner: Mutex::new(Inner::default()),
            signals,
        }
    }

    /// Receive the push signals this store emits for its subscriptions.
    pub fn push_signals(&self) -> broadcast::Receiver<PushSignal> {
        self.signals.subscribe()
    }

    /// Store a record directly, bypassing failure injection and signals.
    pub fn insert_raw(&self, record: RemoteRecord) -> Result<(), RemoteError> {
        let mut inner = self.lock()?;
        inner
            .records
            .insert((record.record_type.clone(), record.key.clone()), record);
        Ok(())
    }

    /// Number of records of `record_type`.
    pub fn record_count(&self, record_type: &str) -> Result<usize, RemoteError> {
        let inner = self.lock()?;
        Ok(inner
            .records
            .keys()
            .filter(|(ty, _)| ty == record_type)
            .count())
    }

    pub fn record(
        &self,
        record_type: &str,
        key: &str,
    ) -> Result<Option<RemoteRecord>, RemoteError> {
        let inner = self.lock()?;
        Ok(inner
            .records
            .get(&(record_type.to_string(), key.to_string()))
            .cloned())
    }

    /// Make the next call of `op` fail with [`RemoteError::Unavailable`].
    pub fn fail_next(&self, op: Operation) -> Result<(), RemoteError> {
        self.lock()?.pending_failures.push(op);
        Ok(())
    }

    /// While offline, every operation fails.
    pub fn set_offline(&self, offline: bool) -> Result<(), RemoteError> {
        self.lock()?.offline = offline;
        Ok(())
    }

    /// How many times `op` has been called, failed calls included.
    pub fn call_count(&self, op: Operation) -> Result<usize, RemoteError> {
        Ok(self.lock()?.calls.get(&op).copied().unwrap_or(0))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, RemoteError> {
        self.inner
            .lock()
            .map_err(|e| RemoteError::Unavailable(format!("mutex poisoned: {e}")))
    }

    /// Lock, count the call, and apply any injected failure.
    fn begin(&self, op: Operation) -> Result<MutexGuard<'_, Inner>, RemoteError> {
        let mut inner = self.lock()?;
        *inner.calls.entry(op).or_default() += 1;
        if inner.offline {
            return Err(RemoteError::Unavailable("remote store is offline".into()));
        }
        if let Some(pos) = inner.pending_failures.iter().position(|p| *p == op) {
            inner.pending_failures.remove(pos);
            return Err(RemoteError::Unavailable(format!("injected {op:?} failure")));
        }
        Ok(inner)
    }

    fn notify(&self, inner: &Inner, record_type: &str, change: ChangeKind) {
        for sub in inner.subscriptions.values() {
            if sub.record_type == record_type && sub.fires_on(change) {
                debug!(subscription = %sub.id, ?change, "emitting push signal");
                // No receivers is fine: nobody is listening for pushes.
                let _ = self.signals.send(PushSignal::for_subscription(sub.id.clone()));
            }
        }
    }
}

fn sort_value(record: &RemoteRecord, attribute: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    match record.get(attribute) {
        Some(RecordValue::Timestamp(ts)) => Some(*ts),
        _ => None,
    }
}

#[async_trait]
impl RemoteDatabase for MemoryDatabase {
    async fn save_record(&self, record: RemoteRecord) -> Result<(), RemoteError> {
        let mut inner = self.begin(Operation::SaveRecord)?;
        let record_type = record.record_type.clone();
        let existed = inner
            .records
            .insert((record.record_type.clone(), record.key.clone()), record)
            .is_some();
        let change = if existed {
            ChangeKind::Update
        } else {
            ChangeKind::Create
        };
        self.notify(&inner, &record_type, change);
        Ok(())
    }

    async fn query_records(&self, query: &RecordQuery) -> Result<QueryResults, RemoteError> {
        let inner = self.begin(Operation::QueryRecords)?;
        let mut matched: Vec<RemoteRecord> = inner
            .records
            .values()
            .filter(|r| r.record_type == query.record_type)
            .cloned()
            .collect();
        // Records without the sort attribute order as oldest.
        matched.sort_by(|a, b| {
            let (ka, kb) = (sort_value(a, &query.sort_by), sort_value(b, &query.sort_by));
            if query.descending { kb.cmp(&ka) } else { ka.cmp(&kb) }
        });
        Ok(matched.into_iter().map(Ok).collect())
    }

    async fn delete_record(&self, record_type: &str, key: &str) -> Result<(), RemoteError> {
        let mut inner = self.begin(Operation::DeleteRecord)?;
        let removed = inner
            .records
            .remove(&(record_type.to_string(), key.to_string()))
            .is_some();
        if removed {
            self.notify(&inner, record_type, ChangeKind::Delete);
        }
        Ok(())
    }

    async fn fetch_subscription(&self, id: &str) -> Result<Option<Subscription>, RemoteError> {
        let inner = self.begin(Operation::FetchSubscription)?;
        Ok(inner.subscriptions.get(id).cloned())
    }

    async fn save_subscription(&self, subscription: Subscription) -> Result<(), RemoteError> {
        let mut inner = self.begin(Operation::SaveSubscription)?;
        inner
            .subscriptions
            .insert(subscription.id.clone(), subscription);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use noticeboard_core::record::attr;

    fn record(key: &str, day: u32) -> RemoteRecord {
        let mut r = RemoteRecord::new("Notice", key);
        r.set(
            attr::CREATED_DATE,
            RecordValue::Timestamp(Utc.with_ymd_and_hms(2025, 9, day, 0, 0, 0).unwrap()),
        );
        r
    }

    fn all_changes(id: &str) -> Subscription {
        Subscription {
            id: id.into(),
            record_type: "Notice".into(),
            fires_on: vec![ChangeKind::Create, ChangeKind::Update, ChangeKind::Delete],
            silent: true,
        }
    }

    #[tokio::test]
    async fn query_sorts_newest_first() {
        let db = MemoryDatabase::new();
        db.save_record(record("a", 2)).await.unwrap();
        db.save_record(record("b", 9)).await.unwrap();
        db.save_record(record("c", 5)).await.unwrap();
        db.insert_raw(RemoteRecord::new("Notice", "undated")).unwrap();
        db.insert_raw(RemoteRecord::new("Comment", "other")).unwrap();

        let results = db
            .query_records(&RecordQuery::newest_first("Notice", attr::CREATED_DATE))
            .await
            .unwrap();
        let keys: Vec<String> = results.into_iter().map(|r| r.unwrap().key).collect();
        assert_eq!(keys, ["b", "c", "a", "undated"]);
    }

    #[tokio::test]
    async fn save_replaces_by_key() {
        let db = MemoryDatabase::new();
        db.save_record(record("a", 1)).await.unwrap();
        db.save_record(record("a", 3)).await.unwrap();
        assert_eq!(db.record_count("Notice").unwrap(), 1);
        let stored = db.record("Notice", "a").unwrap().unwrap();
        assert_eq!(
            stored.created_date(),
            Some(Utc.with_ymd_and_hms(2025, 9, 3, 0, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn delete_missing_key_succeeds() {
        let db = MemoryDatabase::new();
        db.delete_record("Notice", "nope").await.unwrap();
    }

    #[tokio::test]
    async fn injected_failure_applies_once() {
        let db = MemoryDatabase::new();
        db.fail_next(Operation::SaveRecord).unwrap();
        assert!(matches!(
            db.save_record(record("a", 1)).await,
            Err(RemoteError::Unavailable(_))
        ));
        db.save_record(record("a", 1)).await.unwrap();
        assert_eq!(db.call_count(Operation::SaveRecord).unwrap(), 2);
    }

    #[tokio::test]
    async fn offline_fails_every_operation() {
        let db = MemoryDatabase::new();
        db.set_offline(true).unwrap();
        assert!(db.fetch_subscription("x").await.is_err());
        assert!(db.delete_record("Notice", "a").await.is_err());
        db.set_offline(false).unwrap();
        assert!(db.fetch_subscription("x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn subscriptions_emit_signals_on_change() {
        let db = MemoryDatabase::new();
        let mut signals = db.push_signals();
        db.save_subscription(all_changes("notice-changes"))
            .await
            .unwrap();

        db.save_record(record("a", 1)).await.unwrap();
        db.delete_record("Notice", "a").await.unwrap();
        // Deleting again changes nothing and emits nothing.
        db.delete_record("Notice", "a").await.unwrap();

        assert!(signals.try_recv().unwrap().matches("notice-changes"));
        assert!(signals.try_recv().unwrap().matches("notice-changes"));
        assert!(signals.try_recv().is_err());
    }
}
