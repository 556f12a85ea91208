//! UI-thread state: the item list, the status line and the command queue to the store worker.

use std::{io::Write, ops::ControlFlow};

use anyhow::Result;
use client_core::{dispatch_store_command, Item, ItemList, StoreCommand, StoreEvent};
use crossbeam_channel::{select, Receiver, Sender};
use tokio::sync::watch;
use tracing::debug;

use crate::input::{parse_action, ParseError, UiAction, HELP};

pub struct App {
    /// `None` once input has ended and no further commands will be issued.
    cmd_tx: Option<Sender<StoreCommand>>,
    list: ItemList,
    revision: watch::Receiver<u64>,
    status: String,
    show_list: bool,
}

impl App {
    pub fn new(cmd_tx: Sender<StoreCommand>) -> Self {
        let list = ItemList::new();
        let revision = list.subscribe();
        Self {
            cmd_tx: Some(cmd_tx),
            list,
            revision,
            status: String::new(),
            show_list: false,
        }
    }

    pub fn list(&self) -> &ItemList {
        &self.list
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn dispatch(&mut self, cmd: StoreCommand) {
        match &self.cmd_tx {
            Some(cmd_tx) => dispatch_store_command(cmd_tx, cmd, &mut self.status),
            None => self.status = "input closed; command not sent".to_string(),
        }
    }

    pub fn handle_action(&mut self, action: UiAction) -> ControlFlow<()> {
        match action {
            UiAction::Add(text) => self.dispatch(StoreCommand::Save { text }),
            UiAction::Edit { index, text } => {
                let Some(mut item) = self.persisted_item(index) else {
                    return ControlFlow::Continue(());
                };
                item.text = text;
                self.dispatch(StoreCommand::Modify { item });
            }
            UiAction::Remove { index } => {
                if let Some(remote_id) = self
                    .persisted_item(index)
                    .and_then(|item| item.remote_id)
                {
                    self.dispatch(StoreCommand::Delete { remote_id });
                }
            }
            UiAction::Refresh => self.dispatch(StoreCommand::FetchList),
            UiAction::List => self.show_list = true,
            UiAction::Help => self.status = HELP.to_string(),
            UiAction::Quit => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    pub fn handle_line(&mut self, line: &str) -> ControlFlow<()> {
        match parse_action(line) {
            Ok(action) => self.handle_action(action),
            Err(ParseError::Empty) => ControlFlow::Continue(()),
            Err(err) => {
                self.status = err.to_string();
                ControlFlow::Continue(())
            }
        }
    }

    pub fn handle_event(&mut self, event: StoreEvent) {
        self.list.apply(&event);
        match &event {
            StoreEvent::Saved(Err(err)) => self.status = format!("save failed: {err}"),
            StoreEvent::Fetched {
                fetch,
                result: Err(err),
            } if *fetch == self.list.current_fetch() => {
                self.status = format!("skipped a record: {err}");
            }
            StoreEvent::FetchFinished { fetch, result } if *fetch == self.list.current_fetch() => {
                self.status = match result {
                    Ok(()) => format!("{} item(s)", self.list.len()),
                    Err(err) => format!("refresh failed: {err}"),
                };
            }
            StoreEvent::Deleted(Err(err)) => self.status = format!("delete failed: {err}"),
            StoreEvent::Modified {
                result: Err(err), ..
            } => self.status = format!("edit failed: {err}"),
            _ => {}
        }
    }

    /// Writes the list when it changed or was asked for, then any pending status line.
    pub fn flush(&mut self, out: &mut impl Write) -> std::io::Result<()> {
        let changed = self.revision.has_changed().unwrap_or(false);
        if changed || self.show_list {
            self.revision.borrow_and_update();
            self.show_list = false;
            render_list(&self.list, out)?;
        }
        if !self.status.is_empty() {
            writeln!(out, "-- {}", self.status)?;
            self.status.clear();
        }
        out.flush()
    }

    /// Drains typed lines and store events until `quit`, end of input, or the worker going away.
    ///
    /// At end of input the command sender is dropped and outcomes of commands already queued
    /// are still shown before returning.
    pub fn run(
        &mut self,
        input_rx: Receiver<String>,
        ui_rx: Receiver<StoreEvent>,
        out: &mut impl Write,
    ) -> Result<()> {
        loop {
            let flow = select! {
                recv(input_rx) -> line => match line {
                    Ok(line) => self.handle_line(&line),
                    Err(_) => {
                        debug!("input closed; waiting for queued commands");
                        self.cmd_tx = None;
                        for event in ui_rx.iter() {
                            self.handle_event(event);
                            self.flush(out)?;
                        }
                        ControlFlow::Break(())
                    }
                },
                recv(ui_rx) -> event => match event {
                    Ok(event) => {
                        self.handle_event(event);
                        ControlFlow::Continue(())
                    }
                    Err(_) => {
                        self.status = "store worker stopped".to_string();
                        ControlFlow::Break(())
                    }
                },
            };
            self.flush(out)?;
            if flow.is_break() {
                break;
            }
        }
        Ok(())
    }

    fn persisted_item(&mut self, index: usize) -> Option<Item> {
        match self.list.get(index) {
            None => {
                self.status = format!("no item #{}", index + 1);
                None
            }
            Some(item) if !item.is_persisted() => {
                self.status = format!("item #{} has not been saved yet", index + 1);
                None
            }
            Some(item) => Some(item.clone()),
        }
    }
}

fn render_list(list: &ItemList, out: &mut impl Write) -> std::io::Result<()> {
    if list.is_empty() {
        return writeln!(out, "(no items)");
    }
    for (n, item) in list.items().iter().enumerate() {
        writeln!(out, "{:>3}. {}", n + 1, item.text)?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/app_tests.rs"]
mod tests;
