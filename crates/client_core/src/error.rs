use thiserror::Error;

/// Failures surfaced by [`crate::RemoteStore`] operations.
///
/// Store and transport errors pass through unmodified as [`StoreError::Database`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store accepted the request but returned no record")]
    Record,
    #[error("record is missing its store-assigned identifier")]
    RecordId,
    #[error("field `{field}` is missing or has the wrong type")]
    Cast { field: &'static str },
    #[error("query returned more than {limit} records")]
    Cursor { limit: u32 },
    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

impl StoreError {
    /// Whether the store itself reported the failure, as opposed to the response failing to map onto an item.
    pub fn is_database(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}
