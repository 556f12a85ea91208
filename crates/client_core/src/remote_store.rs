//! Item-level operations over a [`RecordDatabase`].
//!
//! Each call performs one remote operation and resolves exactly once. Nothing is retried
//! or logged-and-swallowed here; callers decide what to do with a failure.

use std::sync::Arc;

use futures::{stream::BoxStream, StreamExt};
use shared::{
    domain::{Record, RecordId, ITEMS_RECORD_TYPE, TEXT_FIELD},
    protocol::{RecordQuery, SortDescriptor},
};
use tracing::debug;

use crate::{
    database::{RecordDatabase, RecordStream},
    error::StoreError,
    types::Item,
};

/// Page size for [`RemoteStore::fetch_list`].
pub const FETCH_LIMIT: u32 = 50;

#[derive(Debug)]
pub enum FetchEvent {
    /// One matched record, or a cast failure when it cannot be read as an item.
    Item(Result<Item, StoreError>),
    /// Always the last event of a fetch.
    Finished(Result<(), StoreError>),
}

impl FetchEvent {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished(_))
    }
}

/// Lazy, single-pass sequence of fetch results; the query is issued on first poll.
pub type FetchStream = BoxStream<'static, FetchEvent>;

enum FetchState {
    Pending(Arc<dyn RecordDatabase>),
    Streaming {
        records: RecordStream,
        received: u32,
    },
    Finished,
}

#[derive(Clone)]
pub struct RemoteStore {
    database: Arc<dyn RecordDatabase>,
}

impl RemoteStore {
    pub fn new(database: Arc<dyn RecordDatabase>) -> Self {
        Self { database }
    }

    /// Query used by [`RemoteStore::fetch_list`]: newest items first, text only.
    pub fn items_query() -> RecordQuery {
        RecordQuery {
            record_type: ITEMS_RECORD_TYPE.to_string(),
            sort: SortDescriptor::newest_first(),
            limit: FETCH_LIMIT,
            desired_keys: Some(vec![TEXT_FIELD.to_string()]),
        }
    }

    pub async fn save(&self, item: &Item) -> Result<Item, StoreError> {
        let mut record = Record::new(ITEMS_RECORD_TYPE);
        record.set_field(TEXT_FIELD, item.text.as_str());

        debug!(item_id = %item.id, "saving item");
        let saved = self.database.save(record).await?.ok_or(StoreError::Record)?;
        Item::from_record(&saved)
    }

    pub fn fetch_list(&self) -> FetchStream {
        futures::stream::unfold(
            FetchState::Pending(Arc::clone(&self.database)),
            |state| async move {
                let (mut records, received) = match state {
                    FetchState::Finished => return None,
                    FetchState::Streaming { records, received } => (records, received),
                    FetchState::Pending(database) => {
                        debug!(limit = FETCH_LIMIT, "fetching items");
                        match database.query(Self::items_query()).await {
                            Ok(records) => (records, 0),
                            Err(err) => {
                                return Some((
                                    FetchEvent::Finished(Err(err.into())),
                                    FetchState::Finished,
                                ))
                            }
                        }
                    }
                };

                match records.next().await {
                    Some(Ok(_)) if received >= FETCH_LIMIT => Some((
                        FetchEvent::Finished(Err(StoreError::Cursor { limit: FETCH_LIMIT })),
                        FetchState::Finished,
                    )),
                    Some(Ok(record)) => Some((
                        FetchEvent::Item(Item::from_record(&record)),
                        FetchState::Streaming {
                            records,
                            received: received + 1,
                        },
                    )),
                    Some(Err(err)) => Some((
                        FetchEvent::Finished(Err(err.into())),
                        FetchState::Finished,
                    )),
                    None => Some((FetchEvent::Finished(Ok(())), FetchState::Finished)),
                }
            },
        )
        .boxed()
    }

    pub async fn delete(&self, remote_id: &RecordId) -> Result<RecordId, StoreError> {
        debug!(%remote_id, "deleting item");
        self.database
            .delete(remote_id)
            .await?
            .ok_or(StoreError::Cast { field: "record_id" })
    }

    /// Fetches the stored record, overwrites its text and saves it back.
    pub async fn modify(&self, item: &Item) -> Result<Item, StoreError> {
        let remote_id = item.remote_id.as_ref().ok_or(StoreError::RecordId)?;

        debug!(%remote_id, item_id = %item.id, "modifying item");
        let mut record = self
            .database
            .fetch(remote_id)
            .await?
            .ok_or(StoreError::Record)?;
        record.set_field(TEXT_FIELD, item.text.as_str());

        let saved = self.database.save(record).await?.ok_or(StoreError::Record)?;
        Item::from_record(&saved)
    }
}

#[cfg(test)]
#[path = "tests/remote_store_tests.rs"]
mod tests;
