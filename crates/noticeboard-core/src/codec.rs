//! Conversion between [`Notice`] and the remote store's [`RemoteRecord`].
//!
//! | Notice        | Record attribute | Value kind  |
//! |---------------|------------------|-------------|
//! | `id`          | record key       | UUID string |
//! | `kind`        | `type`           | string      |
//! | `created_date`| `createdDate`    | timestamp   |
//! | `fields`      | `fields`         | JSON bytes  |

use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::notice::{FormField, Notice, NoticeType};
use crate::record::{RECORD_TYPE, RecordValue, RemoteRecord, attr};

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("record type {0:?} is not a notice record")]
    WrongRecordType(String),
    #[error("unrecognised notice type: {0:?}")]
    UnknownNoticeType(String),
    #[error("missing attribute `{0}`")]
    MissingAttribute(&'static str),
    #[error("attribute `{name}` has kind {found}, expected {expected}")]
    AttributeType {
        name: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    #[error("fields blob is malformed: {0}")]
    Fields(#[from] serde_json::Error),
}

/// Encode a notice as a remote record keyed by the notice id.
pub fn encode(notice: &Notice) -> Result<RemoteRecord, serde_json::Error> {
    let blob = serde_json::to_vec(&notice.fields)?;

    let mut record = RemoteRecord::new(RECORD_TYPE, notice.id.to_string());
    record.set(attr::TYPE, RecordValue::String(notice.kind.label().to_string()));
    record.set(attr::CREATED_DATE, RecordValue::Timestamp(notice.created_date));
    record.set(attr::FIELDS, RecordValue::Bytes(blob));
    Ok(record)
}

/// Decode a remote record back into a notice.
///
/// A key that is not a UUID yields a freshly generated id rather than a
/// failure; every other malformation is a [`DecodeError`].
pub fn decode(record: &RemoteRecord) -> Result<Notice, DecodeError> {
    if record.record_type != RECORD_TYPE {
        return Err(DecodeError::WrongRecordType(record.record_type.clone()));
    }

    let label = match record.get(attr::TYPE) {
        Some(RecordValue::String(s)) => s,
        Some(other) => return Err(type_mismatch(attr::TYPE, "string", other)),
        None => return Err(DecodeError::MissingAttribute(attr::TYPE)),
    };
    let kind = NoticeType::from_label(label)
        .ok_or_else(|| DecodeError::UnknownNoticeType(label.clone()))?;

    let created_date = match record.get(attr::CREATED_DATE) {
        Some(RecordValue::Timestamp(ts)) => *ts,
        Some(other) => return Err(type_mismatch(attr::CREATED_DATE, "timestamp", other)),
        None => return Err(DecodeError::MissingAttribute(attr::CREATED_DATE)),
    };

    let blob = match record.get(attr::FIELDS) {
        Some(RecordValue::Bytes(b)) => b,
        Some(other) => return Err(type_mismatch(attr::FIELDS, "bytes", other)),
        None => return Err(DecodeError::MissingAttribute(attr::FIELDS)),
    };
    let fields: Vec<FormField> = serde_json::from_slice(blob)?;

    let id = Uuid::parse_str(&record.key).unwrap_or_else(|_| {
        let fresh = Uuid::new_v4();
        warn!(key = %record.key, id = %fresh, "record key is not a UUID, assigned fresh id");
        fresh
    });

    Ok(Notice::with_id(id, kind, fields, created_date))
}

fn type_mismatch(name: &'static str, expected: &'static str, found: &RecordValue) -> DecodeError {
    DecodeError::AttributeType {
        name,
        expected,
        found: found.kind(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample() -> Notice {
        Notice::with_id(
            Uuid::new_v4(),
            NoticeType::ContractAward,
            vec![
                FormField::new("Title", "Bridge maintenance"),
                FormField::new("Winner", ""),
                FormField {
                    key: "Award Date".into(),
                    value: "2025-09-04".into(),
                    tooltip: Some("Date the contract was awarded".into()),
                },
                FormField::new("Notes", "line one\nline \"two\" — ünïcode"),
            ],
            Utc.with_ymd_and_hms(2025, 9, 4, 12, 30, 0).unwrap(),
        )
    }

    #[test]
    fn encode_sets_key_and_attributes() {
        let n = sample();
        let record = encode(&n).unwrap();
        assert_eq!(record.record_type, RECORD_TYPE);
        assert_eq!(record.key, n.id.to_string());
        assert_eq!(
            record.get(attr::TYPE),
            Some(&RecordValue::String("Contract Award Notice".into()))
        );
        assert_eq!(record.created_date(), Some(n.created_date));
        assert!(matches!(record.get(attr::FIELDS), Some(RecordValue::Bytes(_))));
    }

    #[test]
    fn decode_recovers_encoded_notice() {
        let n = sample();
        let decoded = decode(&encode(&n).unwrap()).unwrap();
        assert_eq!(decoded, n);
        assert_eq!(decoded.fields[1].value, "");
        assert!(decoded.fields[0].tooltip.is_none());
    }

    #[test]
    fn decode_survives_json_transport() {
        let n = sample();
        let json = serde_json::to_string(&encode(&n).unwrap()).unwrap();
        let record: RemoteRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(decode(&record).unwrap(), n);
    }

    #[test]
    fn unknown_type_label_fails() {
        let mut record = encode(&sample()).unwrap();
        record.set(attr::TYPE, RecordValue::String("Invoice".into()));
        assert!(matches!(
            decode(&record),
            Err(DecodeError::UnknownNoticeType(label)) if label == "Invoice"
        ));
    }

    #[test]
    fn missing_timestamp_fails() {
        let mut record = encode(&sample()).unwrap();
        record.attributes.remove(attr::CREATED_DATE);
        assert!(matches!(
            decode(&record),
            Err(DecodeError::MissingAttribute("createdDate"))
        ));
    }

    #[test]
    fn missing_fields_blob_fails() {
        let mut record = encode(&sample()).unwrap();
        record.attributes.remove(attr::FIELDS);
        assert!(matches!(
            decode(&record),
            Err(DecodeError::MissingAttribute("fields"))
        ));
    }

    #[test]
    fn malformed_fields_blob_fails() {
        let mut record = encode(&sample()).unwrap();
        record.set(attr::FIELDS, RecordValue::Bytes(b"{\"key\":1}".to_vec()));
        assert!(matches!(decode(&record), Err(DecodeError::Fields(_))));
    }

    #[test]
    fn wrong_attribute_kind_fails() {
        let mut record = encode(&sample()).unwrap();
        record.set(attr::CREATED_DATE, RecordValue::String("yesterday".into()));
        assert!(matches!(
            decode(&record),
            Err(DecodeError::AttributeType { name: "createdDate", .. })
        ));
    }

    #[test]
    fn non_uuid_key_gets_fresh_id() {
        let n = sample();
        let mut record = encode(&n).unwrap();
        record.key = "legacy-42".into();
        let decoded = decode(&record).unwrap();
        assert_ne!(decoded.id, n.id);
        assert_eq!(decoded.fields, n.fields);
    }

    #[test]
    fn foreign_record_type_fails() {
        let mut record = encode(&sample()).unwrap();
        record.record_type = "Comment".into();
        assert!(matches!(decode(&record), Err(DecodeError::WrongRecordType(_))));
    }
}
