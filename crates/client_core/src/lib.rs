//! Client side of the item store: typed items over remote records, an observable list
//! for display, and the queues connecting a UI thread to the store worker.

pub mod bridge;
pub mod database;
pub mod error;
pub mod item_list;
pub mod remote_store;
pub mod transport;
pub mod types;

pub use bridge::{dispatch_store_command, launch, StoreCommand, StoreEvent};
pub use database::{InMemoryRecordDatabase, RecordDatabase, RecordStream};
pub use error::StoreError;
pub use item_list::ItemList;
pub use remote_store::{FetchEvent, FetchStream, RemoteStore, FETCH_LIMIT};
pub use transport::HttpRecordDatabase;
pub use types::{Item, ItemId};

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
