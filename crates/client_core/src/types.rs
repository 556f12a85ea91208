use std::fmt;

use shared::domain::{Record, RecordId, TEXT_FIELD};
use uuid::Uuid;

use crate::error::StoreError;

/// Process-local identity used for list diffing; never sent to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemId(Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: ItemId,
    /// Set once the item has been saved to the store.
    pub remote_id: Option<RecordId>,
    pub text: String,
}

impl Item {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(),
            remote_id: None,
            text: text.into(),
        }
    }

    pub fn with_remote_id(remote_id: RecordId, text: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(),
            remote_id: Some(remote_id),
            text: text.into(),
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.remote_id.is_some()
    }

    /// Builds a fresh item from a record returned by the store.
    ///
    /// A missing or non-string `text` is a cast failure whether or not the id is present.
    pub fn from_record(record: &Record) -> Result<Self, StoreError> {
        let text = record
            .field(TEXT_FIELD)
            .and_then(|value| value.as_str())
            .ok_or(StoreError::Cast { field: TEXT_FIELD })?;
        let remote_id = record.record_id.clone().ok_or(StoreError::RecordId)?;
        Ok(Self::with_remote_id(remote_id, text))
    }
}
