//! Invalidation signals and the cues that trigger a bulletin refresh.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque "something changed" notification delivered by the platform push
/// transport. Only the subscription id is meaningful to the sync layer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSignal {
    #[serde(default)]
    pub subscription_id: Option<String>,
}

impl PushSignal {
    pub fn for_subscription(id: impl Into<String>) -> Self {
        Self {
            subscription_id: Some(id.into()),
        }
    }

    pub fn matches(&self, subscription_id: &str) -> bool {
        self.subscription_id.as_deref() == Some(subscription_id)
    }
}

/// Whether a delivered push signal led to a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    NewData,
    NoData,
}

/// Why a refresh was requested. All triggers refresh identically; the
/// distinction is only recorded in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    Startup,
    Manual,
    PushSignal,
    Foreground,
    AccountChanged,
    AfterPublish,
    AfterDelete,
}

impl fmt::Display for RefreshTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Startup => "startup",
            Self::Manual => "manual",
            Self::PushSignal => "push_signal",
            Self::Foreground => "foreground",
            Self::AccountChanged => "account_changed",
            Self::AfterPublish => "after_publish",
            Self::AfterDelete => "after_delete",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_matches_only_its_subscription() {
        let signal = PushSignal::for_subscription("notice-changes");
        assert!(signal.matches("notice-changes"));
        assert!(!signal.matches("comment-changes"));
        assert!(!PushSignal::default().matches("notice-changes"));
    }

    #[test]
    fn signal_parses_without_subscription_id() {
        let signal: PushSignal = serde_json::from_str("{}").unwrap();
        assert_eq!(signal, PushSignal::default());
    }
}
