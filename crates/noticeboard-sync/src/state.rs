//! Draft collection and bulletin mirror as owned by the store task.
//!
//! # Invariants
//! - Only the owner task holds a `SyncState`; nothing here is shared.
//! - The bulletin is only ever replaced wholesale by a fetch result.
//! - A fetch result older than the last applied one is discarded.

use noticeboard_core::{Notice, NoticeId};

/// Monotonic token identifying one bulletin fetch.
pub type FetchToken = u64;

#[derive(Debug, Default)]
pub struct SyncState {
    drafts: Vec<Notice>,
    bulletin: Vec<Notice>,
    last_issued: FetchToken,
    last_applied: FetchToken,
}

impl SyncState {
    pub fn drafts(&self) -> &[Notice] {
        &self.drafts
    }

    pub fn bulletin(&self) -> &[Notice] {
        &self.bulletin
    }

    pub fn save_draft(&mut self, notice: Notice) {
        self.drafts.push(notice);
    }

    /// Remove drafts at `indices`; duplicates count once. Returns the indices
    /// that were out of range, which are skipped.
    pub fn delete_drafts(&mut self, indices: &[usize]) -> Vec<usize> {
        let mut sorted = indices.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let (valid, invalid): (Vec<usize>, Vec<usize>) =
            sorted.into_iter().partition(|&i| i < self.drafts.len());
        for &i in valid.iter().rev() {
            self.drafts.remove(i);
        }
        invalid
    }

    /// Remove the draft with `id`, if any.
    pub fn remove_draft(&mut self, id: NoticeId) -> bool {
        match self.drafts.iter().position(|n| n.id == id) {
            Some(pos) => {
                self.drafts.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Issue the token for a new fetch.
    pub fn begin_fetch(&mut self) -> FetchToken {
        self.last_issued += 1;
        self.last_issued
    }

    /// Replace the bulletin with `notices` unless a newer fetch has already
    /// been applied. Returns whether the bulletin was replaced.
    pub fn apply_fetch(&mut self, token: FetchToken, notices: Vec<Notice>) -> bool {
        if token <= self.last_applied {
            return false;
        }
        self.last_applied = token;
        self.bulletin = notices;
        true
    }

    /// Look up a notice in drafts first, then the bulletin.
    pub fn find(&self, id: NoticeId) -> Option<&Notice> {
        self.drafts
            .iter()
            .chain(self.bulletin.iter())
            .find(|n| n.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use noticeboard_core::NoticeType;

    fn drafts(n: usize) -> (SyncState, Vec<Notice>) {
        let mut state = SyncState::default();
        let notices: Vec<Notice> = (0..n)
            .map(|_| Notice::from_template(NoticeType::Pipeline))
            .collect();
        for notice in &notices {
            state.save_draft(notice.clone());
        }
        (state, notices)
    }

    #[test]
    fn delete_drafts_removes_positions_and_keeps_order() {
        let (mut state, notices) = drafts(5);
        let invalid = state.delete_drafts(&[3, 1, 3]);
        assert!(invalid.is_empty());
        assert_eq!(
            state.drafts(),
            &[notices[0].clone(), notices[2].clone(), notices[4].clone()]
        );
    }

    #[test]
    fn delete_drafts_skips_out_of_range() {
        let (mut state, notices) = drafts(2);
        let invalid = state.delete_drafts(&[0, 7]);
        assert_eq!(invalid, vec![7]);
        assert_eq!(state.drafts(), &[notices[1].clone()]);
    }

    #[test]
    fn remove_draft_matches_by_id() {
        let (mut state, notices) = drafts(3);
        assert!(state.remove_draft(notices[1].id));
        assert!(!state.remove_draft(notices[1].id));
        assert_eq!(state.drafts(), &[notices[0].clone(), notices[2].clone()]);
    }

    #[test]
    fn stale_fetch_is_discarded() {
        let mut state = SyncState::default();
        let older = state.begin_fetch();
        let newer = state.begin_fetch();

        let fresh = vec![Notice::from_template(NoticeType::Tender)];
        let stale = vec![Notice::from_template(NoticeType::LowValue)];

        assert!(state.apply_fetch(newer, fresh.clone()));
        assert!(!state.apply_fetch(older, stale));
        assert_eq!(state.bulletin(), fresh.as_slice());
    }

    #[test]
    fn in_order_fetches_both_apply() {
        let mut state = SyncState::default();
        let first = state.begin_fetch();
        let second = state.begin_fetch();
        let a = vec![Notice::from_template(NoticeType::Tender)];
        let b: Vec<Notice> = Vec::new();

        assert!(state.apply_fetch(first, a));
        assert!(state.apply_fetch(second, b));
        assert!(state.bulletin().is_empty());
    }

    #[test]
    fn find_searches_drafts_then_bulletin() {
        let (mut state, notices) = drafts(1);
        let published = Notice::from_template(NoticeType::ContractChange);
        let token = state.begin_fetch();
        state.apply_fetch(token, vec![published.clone()]);

        assert_eq!(state.find(notices[0].id), Some(&notices[0]));
        assert_eq!(state.find(published.id), Some(&published));
        assert!(state.find(uuid::Uuid::new_v4()).is_none());
    }
}
