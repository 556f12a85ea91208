use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Record type holding list items.
pub const ITEMS_RECORD_TYPE: &str = "Items";
/// Field carrying an item's text payload.
pub const TEXT_FIELD: &str = "text";

/// Opaque identifier assigned by the record store when a record is first created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RecordValue {
    String(String),
    Int64(i64),
    Double(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl RecordValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }
}

impl From<&str> for RecordValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for RecordValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// Schema-less remote entity: a type tag, a store-assigned id and timestamps, and named fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub record_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fields: BTreeMap<String, RecordValue>,
}

impl Record {
    /// A record that has not been persisted yet.
    pub fn new(record_type: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            record_id: None,
            created_at: None,
            modified_at: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn field(&self, key: &str) -> Option<&RecordValue> {
        self.fields.get(key)
    }

    pub fn set_field(&mut self, key: impl Into<String>, value: impl Into<RecordValue>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Keeps only the named fields; `None` keeps everything.
    pub fn project(mut self, desired_keys: Option<&[String]>) -> Self {
        if let Some(keys) = desired_keys {
            self.fields.retain(|key, _| keys.iter().any(|wanted| wanted == key));
        }
        self
    }
}
