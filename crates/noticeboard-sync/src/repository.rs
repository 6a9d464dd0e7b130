//! Notice-level operations on the remote store.

use std::sync::Arc;

use noticeboard_core::record::attr;
use noticeboard_core::{Notice, NoticeId, RECORD_TYPE, codec};
use tracing::{info, warn};

use crate::RemoteError;
use crate::remote::{RecordQuery, RemoteDatabase};

/// Thin async client over a [`RemoteDatabase`] that speaks in notices.
///
/// Holds only the shared database handle; clones are cheap and safe to use
/// from concurrent tasks.
#[derive(Clone)]
pub struct NoticeRepository {
    db: Arc<dyn RemoteDatabase>,
}

impl NoticeRepository {
    pub fn new(db: Arc<dyn RemoteDatabase>) -> Self {
        Self { db }
    }

    /// Create or replace the remote record for `notice`, keyed by its id.
    pub async fn create(&self, notice: &Notice) -> Result<(), RemoteError> {
        let record = codec::encode(notice)?;
        self.db.save_record(record).await?;
        info!(id = %notice.id, kind = %notice.kind, "notice saved to remote store");
        Ok(())
    }

    /// Every decodable notice, newest first.
    ///
    /// Unreadable or undecodable records are logged and left out; they never
    /// fail the whole query.
    pub async fn query_all(&self) -> Result<Vec<Notice>, RemoteError> {
        let query = RecordQuery::newest_first(RECORD_TYPE, attr::CREATED_DATE);
        let results = self.db.query_records(&query).await?;

        let mut notices = Vec::with_capacity(results.len());
        let mut dropped = 0usize;
        for result in results {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable record");
                    dropped += 1;
                    continue;
                }
            };
            match codec::decode(&record) {
                Ok(notice) => notices.push(notice),
                Err(e) => {
                    warn!(key = %record.key, error = %e, "skipping malformed notice record");
                    dropped += 1;
                }
            }
        }
        info!(count = notices.len(), dropped, "fetched notices");
        Ok(notices)
    }

    /// Delete the remote record for `id`.
    pub async fn delete(&self, id: NoticeId) -> Result<(), RemoteError> {
        self.db.delete_record(RECORD_TYPE, &id.to_string()).await?;
        info!(id = %id, "notice deleted from remote store");
        Ok(())
    }
}
