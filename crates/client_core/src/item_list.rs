//! Ordered items mirrored for display.
//!
//! The list is owned by the thread that drains [`crate::bridge::StoreEvent`]s; it has no
//! internal locking. Every write bumps a revision observable through [`ItemList::subscribe`].
//!
//! Fetches may overlap; only the newest one started populates the list. An item is listed at
//! most once per remote id.

use shared::domain::RecordId;
use tokio::sync::watch;

use crate::{bridge::StoreEvent, types::Item};

pub struct ItemList {
    items: Vec<Item>,
    current_fetch: u64,
    revision: watch::Sender<u64>,
}

impl Default for ItemList {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemList {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            items: Vec::new(),
            current_fetch: 0,
            revision,
        }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of the fetch whose items the list currently holds; 0 before any fetch.
    pub fn current_fetch(&self) -> u64 {
        self.current_fetch
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Receiver that observes a new revision after every write.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn push(&mut self, item: Item) {
        self.items.push(item);
        self.notify();
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.notify();
    }

    pub fn remove_by_remote_id(&mut self, remote_id: &RecordId) -> Option<Item> {
        let index = self.position(remote_id)?;
        let removed = self.items.remove(index);
        self.notify();
        Some(removed)
    }

    /// Replaces in place; returns `false` when no item carries `remote_id`.
    pub fn replace_by_remote_id(&mut self, remote_id: &RecordId, item: Item) -> bool {
        let Some(index) = self.position(remote_id) else {
            return false;
        };
        self.items[index] = item;
        self.notify();
        true
    }

    /// Applies a store outcome. Failures leave the list untouched. Returns whether it changed.
    pub fn apply(&mut self, event: &StoreEvent) -> bool {
        match event {
            StoreEvent::FetchStarted { fetch } => {
                if *fetch < self.current_fetch {
                    return false;
                }
                self.current_fetch = *fetch;
                self.clear();
                true
            }
            StoreEvent::Fetched {
                fetch,
                result: Ok(item),
            } => *fetch == self.current_fetch && self.push_unlisted(item),
            StoreEvent::Saved(Ok(item)) => self.push_unlisted(item),
            StoreEvent::Deleted(Ok(remote_id)) => self.remove_by_remote_id(remote_id).is_some(),
            StoreEvent::Modified {
                previous,
                result: Ok(item),
            } => match &previous.remote_id {
                Some(remote_id) => self.replace_by_remote_id(remote_id, item.clone()),
                None => false,
            },
            StoreEvent::Saved(Err(_))
            | StoreEvent::Fetched { result: Err(_), .. }
            | StoreEvent::FetchFinished { .. }
            | StoreEvent::Deleted(Err(_))
            | StoreEvent::Modified { result: Err(_), .. } => false,
        }
    }

    fn push_unlisted(&mut self, item: &Item) -> bool {
        if let Some(remote_id) = &item.remote_id {
            if self.position(remote_id).is_some() {
                return false;
            }
        }
        self.push(item.clone());
        true
    }

    fn position(&self, remote_id: &RecordId) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.remote_id.as_ref() == Some(remote_id))
    }

    fn notify(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }
}

#[cfg(test)]
#[path = "tests/item_list_tests.rs"]
mod tests;
