//! Notice types shared between the draft collection, the bulletin mirror, and
//! the remote store codec.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Stable identifier of a notice. Reused verbatim as the remote record key.
pub type NoticeId = Uuid;

/// One key/value entry of a notice form.
///
/// Identity is positional within the owning [`Notice`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub key: String,
    pub value: String,
    /// Help text shown under the input. `None` when the field has none.
    #[serde(default)]
    pub tooltip: Option<String>,
}

impl FormField {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            tooltip: None,
        }
    }

    /// Empty-valued field carrying a tooltip, as used by templates.
    pub fn with_tooltip(key: impl Into<String>, tooltip: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: String::new(),
            tooltip: Some(tooltip.into()),
        }
    }
}

/// Closed set of notice categories.
///
/// Serialised as the human label (e.g. `"Tender Notice"`), which is also the
/// canonical string stored in the remote record's `type` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoticeType {
    #[serde(rename = "Planned Procurement Notice")]
    PlannedProcurement,
    #[serde(rename = "Tender Notice")]
    Tender,
    #[serde(rename = "Transparency Notice")]
    Transparency,
    #[serde(rename = "Contract Award Notice")]
    ContractAward,
    #[serde(rename = "Contract Change Notice")]
    ContractChange,
    #[serde(rename = "Contract Termination Notice")]
    ContractTermination,
    #[serde(rename = "Pipeline Notice")]
    Pipeline,
    #[serde(rename = "Low Value Notice")]
    LowValue,
}

impl NoticeType {
    /// Every variant, in catalogue order.
    pub const ALL: [NoticeType; 8] = [
        Self::PlannedProcurement,
        Self::Tender,
        Self::Transparency,
        Self::ContractAward,
        Self::ContractChange,
        Self::ContractTermination,
        Self::Pipeline,
        Self::LowValue,
    ];

    /// Human label, also the canonical wire string.
    pub fn label(&self) -> &'static str {
        match self {
            Self::PlannedProcurement => "Planned Procurement Notice",
            Self::Tender => "Tender Notice",
            Self::Transparency => "Transparency Notice",
            Self::ContractAward => "Contract Award Notice",
            Self::ContractChange => "Contract Change Notice",
            Self::ContractTermination => "Contract Termination Notice",
            Self::Pipeline => "Pipeline Notice",
            Self::LowValue => "Low Value Notice",
        }
    }

    /// Short command-line friendly name.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::PlannedProcurement => "planned-procurement",
            Self::Tender => "tender",
            Self::Transparency => "transparency",
            Self::ContractAward => "award",
            Self::ContractChange => "change",
            Self::ContractTermination => "termination",
            Self::Pipeline => "pipeline",
            Self::LowValue => "low-value",
        }
    }

    /// Look up a variant by its exact canonical label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.label() == label)
    }
}

impl fmt::Display for NoticeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
#[error("unknown notice type: {0}")]
pub struct UnknownNoticeType(pub String);

impl FromStr for NoticeType {
    type Err = UnknownNoticeType;

    /// Accepts either the slug or the label, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| {
                t.slug().eq_ignore_ascii_case(needle) || t.label().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| UnknownNoticeType(s.to_string()))
    }
}

/// A user-authored structured record of a fixed category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub id: NoticeId,
    #[serde(rename = "type")]
    pub kind: NoticeType,
    /// Order is significant and preserved through the remote store.
    pub fields: Vec<FormField>,
    pub created_date: DateTime<Utc>,
}

impl Notice {
    /// Create a notice with a fresh id, stamped with the current time.
    pub fn new(kind: NoticeType, fields: Vec<FormField>) -> Self {
        Self::with_id(Uuid::new_v4(), kind, fields, Utc::now())
    }

    /// Create a notice whose identity already exists (e.g. decoded from the
    /// remote store).
    pub fn with_id(
        id: NoticeId,
        kind: NoticeType,
        fields: Vec<FormField>,
        created_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind,
            fields,
            created_date,
        }
    }

    /// New, empty notice laid out from the type's template.
    pub fn from_template(kind: NoticeType) -> Self {
        Self::new(kind, kind.template())
    }

    /// Value of the first field whose key matches `key` case-insensitively.
    pub fn field_value(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.key.eq_ignore_ascii_case(key))
            .map(|f| f.value.as_str())
    }

    /// Set the value of the first field matching `key`, appending a new field
    /// when none matches.
    pub fn set_field(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.fields.iter_mut().find(|f| f.key.eq_ignore_ascii_case(key)) {
            Some(field) => field.value = value,
            None => self.fields.push(FormField::new(key, value)),
        }
    }

    /// `"<Title> (<label>)"` when a non-empty Title field exists, else the label.
    pub fn display_title(&self) -> String {
        match self.field_value("title") {
            Some(title) if !title.is_empty() => format!("{title} ({})", self.kind.label()),
            _ => self.kind.label().to_string(),
        }
    }

    /// True when at least one field holds a non-blank value.
    pub fn has_content(&self) -> bool {
        self.fields.iter().any(|f| !f.value.trim().is_empty())
    }

    /// Pretty-printed `{id, type, fields, createdDate}` document for display
    /// and sharing. Not part of the sync protocol.
    pub fn to_export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
