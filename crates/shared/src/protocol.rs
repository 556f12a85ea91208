use serde::{Deserialize, Serialize};

use crate::{
    domain::{Record, RecordId},
    error::ApiError,
};

/// Largest page a single query may return, whatever the caller asks for.
pub const MAX_QUERY_LIMIT: u32 = 200;

pub fn records_route() -> &'static str {
    "/records"
}

pub fn record_route(record_id: &RecordId) -> String {
    format!("/records/{}", record_id.as_str())
}

pub fn records_query_route() -> &'static str {
    "/records/query"
}

/// Server-assigned fields a query can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    CreatedAt,
    ModifiedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDescriptor {
    pub key: SortKey,
    pub ascending: bool,
}

impl SortDescriptor {
    pub fn newest_first() -> Self {
        Self {
            key: SortKey::CreatedAt,
            ascending: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordQuery {
    pub record_type: String,
    pub sort: SortDescriptor,
    pub limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_keys: Option<Vec<String>>,
}

impl RecordQuery {
    pub fn effective_limit(&self) -> u32 {
        self.limit.clamp(1, MAX_QUERY_LIMIT)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveRecordRequest {
    pub record: Record,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveRecordResponse {
    #[serde(default)]
    pub record: Option<Record>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchRecordResponse {
    #[serde(default)]
    pub record: Option<Record>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRecordResponse {
    #[serde(default)]
    pub record_id: Option<RecordId>,
}

/// One line of a query response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum QueryEvent {
    Record { record: Record },
    Done,
    Error(ApiError),
}
