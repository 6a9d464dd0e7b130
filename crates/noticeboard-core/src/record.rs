//! Generic keyed-record representation used by the remote store.
//!
//! The remote store knows nothing about notices: a record is a type name, a
//! string key, and a flat map of typed attributes. Nested data (the ordered
//! field list) travels as an opaque byte blob.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Record type under which notices are stored remotely.
pub const RECORD_TYPE: &str = "Notice";

/// Well-known identifier of the standing change subscription.
pub const SUBSCRIPTION_ID: &str = "notice-changes";

/// Attribute names on a notice record.
pub mod attr {
    pub const TYPE: &str = "type";
    pub const CREATED_DATE: &str = "createdDate";
    pub const FIELDS: &str = "fields";
}

/// A single typed attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RecordValue {
    String(String),
    Timestamp(DateTime<Utc>),
    Bytes(Vec<u8>),
}

impl RecordValue {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Timestamp(_) => "timestamp",
            Self::Bytes(_) => "bytes",
        }
    }
}

/// A record as stored by the remote keyed-record service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecord {
    pub record_type: String,
    pub key: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, RecordValue>,
}

impl RemoteRecord {
    pub fn new(record_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            key: key.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, name: &str, value: RecordValue) {
        self.attributes.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&RecordValue> {
        self.attributes.get(name)
    }

    /// The `createdDate` attribute, if present and a timestamp.
    pub fn created_date(&self) -> Option<DateTime<Utc>> {
        match self.get(attr::CREATED_DATE) {
            Some(RecordValue::Timestamp(ts)) => Some(*ts),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_value_json_is_tagged() {
        let v = RecordValue::String("Tender Notice".into());
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["kind"], "string");
        assert_eq!(json["value"], "Tender Notice");
    }

    #[test]
    fn created_date_requires_timestamp_kind() {
        let mut record = RemoteRecord::new(RECORD_TYPE, "k");
        assert!(record.created_date().is_none());

        record.set(attr::CREATED_DATE, RecordValue::String("2025-09-04".into()));
        assert!(record.created_date().is_none());

        let now = Utc::now();
        record.set(attr::CREATED_DATE, RecordValue::Timestamp(now));
        assert_eq!(record.created_date(), Some(now));
    }

    #[test]
    fn record_json_uses_camel_case() {
        let record = RemoteRecord::new(RECORD_TYPE, "abc");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["recordType"], "Notice");
        assert_eq!(json["key"], "abc");
    }
}
