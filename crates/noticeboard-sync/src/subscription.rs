//! Keeps exactly one standing change subscription for notice records.

use std::sync::Arc;

use noticeboard_core::{RECORD_TYPE, SUBSCRIPTION_ID};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::remote::{ChangeKind, RemoteDatabase, Subscription};

/// What [`SubscriptionManager::ensure_subscribed`] ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    AlreadySubscribed,
    Created,
    /// Creation failed; only manual refreshes will update the bulletin.
    Failed,
}

#[derive(Clone)]
pub struct SubscriptionManager {
    db: Arc<dyn RemoteDatabase>,
}

impl SubscriptionManager {
    pub fn new(db: Arc<dyn RemoteDatabase>) -> Self {
        Self { db }
    }

    /// The subscription this manager registers.
    pub fn desired() -> Subscription {
        Subscription {
            id: SUBSCRIPTION_ID.to_string(),
            record_type: RECORD_TYPE.to_string(),
            fires_on: vec![ChangeKind::Create, ChangeKind::Update, ChangeKind::Delete],
            silent: true,
        }
    }

    /// Register the notice subscription unless it already exists.
    ///
    /// Never fails: errors are logged and reported as
    /// [`SubscriptionStatus::Failed`]. No retry.
    pub async fn ensure_subscribed(&self) -> SubscriptionStatus {
        match self.db.fetch_subscription(SUBSCRIPTION_ID).await {
            Ok(Some(_)) => {
                info!(subscription = SUBSCRIPTION_ID, "already subscribed to notice changes");
                return SubscriptionStatus::AlreadySubscribed;
            }
            Ok(None) => {}
            // An unreadable lookup is treated as absent.
            Err(e) => debug!(error = %e, "subscription lookup failed"),
        }

        match self.db.save_subscription(Self::desired()).await {
            Ok(()) => {
                info!(subscription = SUBSCRIPTION_ID, "subscribed to notice changes");
                SubscriptionStatus::Created
            }
            Err(e) => {
                warn!(error = %e, "subscription setup failed, falling back to manual refresh");
                SubscriptionStatus::Failed
            }
        }
    }

    /// Fire-and-forget variant of [`ensure_subscribed`](Self::ensure_subscribed).
    pub fn spawn_ensure(&self) -> JoinHandle<SubscriptionStatus> {
        let manager = self.clone();
        tokio::spawn(async move { manager.ensure_subscribed().await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryDatabase, Operation};

    fn setup() -> (Arc<MemoryDatabase>, SubscriptionManager) {
        let db = Arc::new(MemoryDatabase::new());
        let manager = SubscriptionManager::new(db.clone());
        (db, manager)
    }

    #[tokio::test]
    async fn creates_subscription_once() {
        let (db, manager) = setup();
        assert_eq!(manager.ensure_subscribed().await, SubscriptionStatus::Created);
        assert_eq!(
            manager.ensure_subscribed().await,
            SubscriptionStatus::AlreadySubscribed
        );
        assert_eq!(db.call_count(Operation::SaveSubscription).unwrap(), 1);

        let stored = db.fetch_subscription(SUBSCRIPTION_ID).await.unwrap().unwrap();
        assert_eq!(stored, SubscriptionManager::desired());
        assert!(stored.silent);
    }

    #[tokio::test]
    async fn creation_failure_is_not_fatal() {
        let (db, manager) = setup();
        db.fail_next(Operation::SaveSubscription).unwrap();
        assert_eq!(manager.ensure_subscribed().await, SubscriptionStatus::Failed);
        assert!(db.fetch_subscription(SUBSCRIPTION_ID).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lookup_failure_still_attempts_creation() {
        let (db, manager) = setup();
        db.fail_next(Operation::FetchSubscription).unwrap();
        assert_eq!(manager.ensure_subscribed().await, SubscriptionStatus::Created);
    }

    #[tokio::test]
    async fn spawned_setup_completes() {
        let (_db, manager) = setup();
        let status = manager.spawn_ensure().await.unwrap();
        assert_eq!(status, SubscriptionStatus::Created);
    }
}
