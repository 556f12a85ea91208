//! Seam between the item adapter and whatever actually stores records.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use futures::{stream::BoxStream, StreamExt};
use shared::{
    domain::{Record, RecordId},
    protocol::{RecordQuery, SortKey},
};
use tokio::sync::Mutex;

/// Query results in delivery order. Failures after the query started arrive as stream items.
pub type RecordStream = BoxStream<'static, Result<Record>>;

#[async_trait]
pub trait RecordDatabase: Send + Sync {
    /// Creates the record when it has no id, otherwise overwrites the stored fields.
    async fn save(&self, record: Record) -> Result<Option<Record>>;
    async fn fetch(&self, record_id: &RecordId) -> Result<Option<Record>>;
    /// Resolves to the id the store acknowledged as deleted.
    async fn delete(&self, record_id: &RecordId) -> Result<Option<RecordId>>;
    async fn query(&self, query: RecordQuery) -> Result<RecordStream>;
}

/// Process-local record store with the same id, timestamp and ordering rules as the server.
#[derive(Default)]
pub struct InMemoryRecordDatabase {
    records: Mutex<Vec<Record>>,
}

impl InMemoryRecordDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl RecordDatabase for InMemoryRecordDatabase {
    async fn save(&self, mut record: Record) -> Result<Option<Record>> {
        let now = Utc::now();
        let mut records = self.records.lock().await;

        let Some(record_id) = record.record_id.clone() else {
            record.record_id = Some(RecordId::generate());
            record.created_at = Some(now);
            record.modified_at = Some(now);
            records.push(record.clone());
            return Ok(Some(record));
        };

        let Some(stored) = records
            .iter_mut()
            .find(|stored| stored.record_id.as_ref() == Some(&record_id))
        else {
            return Ok(None);
        };
        stored.fields = record.fields;
        stored.modified_at = Some(now);
        Ok(Some(stored.clone()))
    }

    async fn fetch(&self, record_id: &RecordId) -> Result<Option<Record>> {
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .find(|record| record.record_id.as_ref() == Some(record_id))
            .cloned())
    }

    async fn delete(&self, record_id: &RecordId) -> Result<Option<RecordId>> {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|record| record.record_id.as_ref() != Some(record_id));
        if records.len() == before {
            anyhow::bail!("record {record_id} not found");
        }
        Ok(Some(record_id.clone()))
    }

    async fn query(&self, query: RecordQuery) -> Result<RecordStream> {
        let records = self.records.lock().await;
        let mut matches: Vec<(usize, &Record)> = records
            .iter()
            .enumerate()
            .filter(|(_, record)| record.record_type == query.record_type)
            .collect();

        // Insertion order breaks timestamp ties.
        matches.sort_by(|(a_seq, a), (b_seq, b)| {
            let ordering = match query.sort.key {
                SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
                SortKey::ModifiedAt => a.modified_at.cmp(&b.modified_at),
            }
            .then(a_seq.cmp(b_seq));
            if query.sort.ascending {
                ordering
            } else {
                ordering.reverse()
            }
        });

        let selected: Vec<Result<Record>> = matches
            .into_iter()
            .take(query.effective_limit() as usize)
            .map(|(_, record)| Ok(record.clone().project(query.desired_keys.as_deref())))
            .collect();

        Ok(futures::stream::iter(selected).boxed())
    }
}
