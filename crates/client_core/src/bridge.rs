//! Command queue from the UI thread to a store worker, and the event queue back.
//!
//! The worker owns a tokio runtime and runs every command as its own task. Outcomes are
//! delivered on the UI queue; whichever thread drains it is the only writer of the
//! [`crate::ItemList`].

use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use futures::StreamExt;
use shared::domain::RecordId;
use tracing::{debug, error, warn};

use crate::{
    error::StoreError,
    remote_store::{FetchEvent, RemoteStore},
    types::Item,
};

#[derive(Debug, Clone)]
pub enum StoreCommand {
    Save { text: String },
    FetchList,
    Delete { remote_id: RecordId },
    Modify { item: Item },
}

impl StoreCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Save { .. } => "save",
            Self::FetchList => "fetch_list",
            Self::Delete { .. } => "delete",
            Self::Modify { .. } => "modify",
        }
    }
}

#[derive(Debug)]
pub enum StoreEvent {
    Saved(Result<Item, StoreError>),
    /// Sent before the first `Fetched` of fetch `fetch`; the list is repopulated wholesale.
    /// Fetch numbers increase in dispatch order.
    FetchStarted { fetch: u64 },
    Fetched {
        fetch: u64,
        result: Result<Item, StoreError>,
    },
    FetchFinished {
        fetch: u64,
        result: Result<(), StoreError>,
    },
    Deleted(Result<RecordId, StoreError>),
    Modified {
        previous: Item,
        result: Result<Item, StoreError>,
    },
}

impl StoreEvent {
    pub fn error(&self) -> Option<&StoreError> {
        match self {
            Self::Saved(Err(err))
            | Self::Fetched {
                result: Err(err), ..
            }
            | Self::FetchFinished {
                result: Err(err), ..
            }
            | Self::Deleted(Err(err))
            | Self::Modified {
                result: Err(err), ..
            } => Some(err),
            _ => None,
        }
    }
}

/// Starts the store worker thread. It exits once every command sender is dropped and
/// in-flight commands have delivered their events.
///
/// `ui_tx` should be unbounded: store tasks block on a full queue.
pub fn launch(
    store: RemoteStore,
    cmd_rx: Receiver<StoreCommand>,
    ui_tx: Sender<StoreEvent>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("store-worker".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(err) => {
                    error!("failed to build store worker runtime: {err}");
                    return;
                }
            };

            let mut in_flight: Vec<tokio::task::JoinHandle<()>> = Vec::new();
            let mut last_fetch = 0;
            while let Ok(cmd) = cmd_rx.recv() {
                debug!(command = cmd.name(), "store command received");
                in_flight.retain(|task| !task.is_finished());
                if let StoreCommand::FetchList = cmd {
                    last_fetch += 1;
                }
                in_flight.push(runtime.spawn(run_command(
                    store.clone(),
                    cmd,
                    last_fetch,
                    ui_tx.clone(),
                )));
            }

            runtime.block_on(async {
                for task in in_flight {
                    if let Err(err) = task.await {
                        error!("store command task failed: {err}");
                    }
                }
            });
            debug!("store worker stopped");
        })
}

/// `fetch` numbers a `FetchList`; other commands ignore it.
async fn run_command(
    store: RemoteStore,
    cmd: StoreCommand,
    fetch: u64,
    ui_tx: Sender<StoreEvent>,
) {
    let name = cmd.name();
    match cmd {
        StoreCommand::Save { text } => {
            let result = store.save(&Item::new(text)).await;
            deliver(&ui_tx, name, StoreEvent::Saved(result));
        }
        StoreCommand::FetchList => run_fetch(store, fetch, ui_tx).await,
        StoreCommand::Delete { remote_id } => {
            let result = store.delete(&remote_id).await;
            deliver(&ui_tx, name, StoreEvent::Deleted(result));
        }
        StoreCommand::Modify { item } => {
            let result = store.modify(&item).await;
            deliver(
                &ui_tx,
                name,
                StoreEvent::Modified {
                    previous: item,
                    result,
                },
            );
        }
    }
}

async fn run_fetch(store: RemoteStore, fetch: u64, ui_tx: Sender<StoreEvent>) {
    const NAME: &str = "fetch_list";
    if !deliver(&ui_tx, NAME, StoreEvent::FetchStarted { fetch }) {
        return;
    }
    let mut events = store.fetch_list();
    while let Some(event) = events.next().await {
        let event = match event {
            FetchEvent::Item(result) => StoreEvent::Fetched { fetch, result },
            FetchEvent::Finished(result) => StoreEvent::FetchFinished { fetch, result },
        };
        if !deliver(&ui_tx, NAME, event) {
            return;
        }
    }
}

/// Returns `false` once the UI side has gone away.
fn deliver(ui_tx: &Sender<StoreEvent>, command: &'static str, event: StoreEvent) -> bool {
    if let Some(err) = event.error() {
        warn!(command, error = %err, "store operation failed");
    }
    if ui_tx.send(event).is_err() {
        debug!(command, "ui event queue closed; dropping store event");
        return false;
    }
    true
}

/// Queues a command without blocking the UI thread, reporting a full or closed queue in `status`.
pub fn dispatch_store_command(
    cmd_tx: &Sender<StoreCommand>,
    cmd: StoreCommand,
    status: &mut String,
) {
    let cmd_name = cmd.name();
    match cmd_tx.try_send(cmd) {
        Ok(()) => debug!(command = cmd_name, "queued ui->store command"),
        Err(TrySendError::Full(_)) => {
            *status = "Store command queue is full; please retry".to_string();
        }
        Err(TrySendError::Disconnected(_)) => {
            *status = "Store worker is not running; restart the app".to_string();
        }
    }
}

#[cfg(test)]
#[path = "tests/bridge_tests.rs"]
mod tests;
