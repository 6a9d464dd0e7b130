//! Sync layer: remote repository client, change subscription, and the notice
//! store that reconciles local drafts with the shared bulletin.

mod error;
pub mod memory;
pub mod push;
pub mod remote;
pub mod repository;
mod state;
pub mod store;
pub mod subscription;

#[cfg(feature = "http")]
pub mod http;

pub use error::{RemoteError, StoreError};
pub use memory::MemoryDatabase;
pub use push::{PushOutcome, PushSignal, RefreshTrigger};
pub use remote::{RemoteDatabase, Subscription};
pub use repository::NoticeRepository;
pub use store::{NoticeStore, StoreEvent, StoreHandle};
pub use subscription::{SubscriptionManager, SubscriptionStatus};

#[cfg(feature = "http")]
pub use http::HttpDatabase;

use std::sync::Arc;

/// Wire a store against `db`: one repository client and one subscription
/// manager sharing the same database handle.
pub fn connect(db: Arc<dyn RemoteDatabase>) -> StoreHandle {
    NoticeStore::spawn(
        NoticeRepository::new(db.clone()),
        SubscriptionManager::new(db),
    )
}
