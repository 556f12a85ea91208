use std::{sync::Arc, time::Duration};

use client_core::{
    launch, InMemoryRecordDatabase, Item, RemoteStore, StoreCommand, StoreError, StoreEvent,
};
use crossbeam_channel::{bounded, unbounded, Receiver};
use shared::domain::RecordId;

use super::*;

fn app_with_queue(capacity: usize) -> (App, Receiver<StoreCommand>) {
    let (cmd_tx, cmd_rx) = bounded(capacity);
    (App::new(cmd_tx), cmd_rx)
}

fn saved(remote_id: &str, text: &str) -> StoreEvent {
    StoreEvent::Saved(Ok(Item::with_remote_id(RecordId::new(remote_id), text)))
}

fn output(app: &mut App) -> String {
    let mut out = Vec::new();
    app.flush(&mut out).expect("flush to vec");
    String::from_utf8(out).expect("utf8 output")
}

#[test]
fn add_queues_a_save_command() {
    let (mut app, cmd_rx) = app_with_queue(4);
    assert!(app.handle_line("add buy milk").is_continue());
    match cmd_rx.try_recv().expect("queued command") {
        StoreCommand::Save { text } => assert_eq!(text, "buy milk"),
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn edit_and_remove_target_the_numbered_item() {
    let (mut app, cmd_rx) = app_with_queue(4);
    app.handle_event(saved("r-1", "first"));
    app.handle_event(saved("r-2", "second"));

    app.handle_line("edit 2 second, revised");
    match cmd_rx.try_recv().expect("modify queued") {
        StoreCommand::Modify { item } => {
            assert_eq!(item.remote_id, Some(RecordId::new("r-2")));
            assert_eq!(item.text, "second, revised");
        }
        other => panic!("unexpected command {other:?}"),
    }
    // The list keeps the old text until the store confirms.
    assert_eq!(app.list().get(1).map(|item| item.text.as_str()), Some("second"));

    app.handle_line("rm 1");
    match cmd_rx.try_recv().expect("delete queued") {
        StoreCommand::Delete { remote_id } => assert_eq!(remote_id, RecordId::new("r-1")),
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn out_of_range_item_sets_status_without_dispatch() {
    let (mut app, cmd_rx) = app_with_queue(4);
    app.handle_line("rm 3");
    assert!(cmd_rx.try_recv().is_err());
    assert_eq!(app.status(), "no item #3");
}

#[test]
fn full_queue_is_reported_in_status() {
    let (mut app, _cmd_rx) = app_with_queue(1);
    app.handle_line("refresh");
    app.handle_line("refresh");
    assert!(app.status().contains("queue is full"));
}

#[test]
fn failures_surface_as_status_and_leave_list_alone() {
    let (mut app, _cmd_rx) = app_with_queue(4);
    app.handle_event(saved("r-1", "keep me"));
    app.handle_event(StoreEvent::Deleted(Err(StoreError::Record)));
    assert_eq!(app.list().len(), 1);
    assert!(app.status().starts_with("delete failed"));
}

#[test]
fn flush_renders_list_only_after_changes() {
    let (mut app, _cmd_rx) = app_with_queue(4);
    app.handle_event(saved("r-1", "water plants"));
    let first = output(&mut app);
    assert!(first.contains("  1. water plants"));

    assert_eq!(output(&mut app), "");

    app.handle_line("ls");
    assert!(output(&mut app).contains("water plants"));

    app.handle_line("bogus");
    assert!(output(&mut app).starts_with("-- unknown command"));
}

#[test]
fn quit_breaks_the_loop() {
    let (mut app, _cmd_rx) = app_with_queue(4);
    assert!(app.handle_line("quit").is_break());
}

#[test]
fn run_drives_worker_until_quit() {
    let database = Arc::new(InMemoryRecordDatabase::new());
    let (cmd_tx, cmd_rx) = bounded(16);
    let (ui_tx, ui_rx) = unbounded();
    let worker = launch(RemoteStore::new(database), cmd_rx, ui_tx).expect("worker starts");

    let mut app = App::new(cmd_tx);
    app.handle_line("add buy milk");
    let event = ui_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("save outcome");
    app.handle_event(event);
    assert_eq!(app.list().len(), 1);
    assert_eq!(app.list().get(0).map(|item| item.text.as_str()), Some("buy milk"));

    let (input_tx, input_rx) = unbounded();
    input_tx.send("quit".to_string()).expect("queue quit");
    let mut out = Vec::new();
    app.run(input_rx, ui_rx, &mut out).expect("run loop");

    drop(app);
    worker.join().expect("worker exits");
}

#[test]
fn end_of_input_still_shows_queued_outcomes() {
    let database = Arc::new(InMemoryRecordDatabase::new());
    let (cmd_tx, cmd_rx) = bounded(16);
    let (ui_tx, ui_rx) = unbounded();
    let worker = launch(RemoteStore::new(database), cmd_rx, ui_tx).expect("worker starts");

    let mut app = App::new(cmd_tx);
    let (input_tx, input_rx) = unbounded();
    input_tx.send("add piped item".to_string()).expect("queue line");
    drop(input_tx);

    let mut out = Vec::new();
    app.run(input_rx, ui_rx, &mut out).expect("run loop");
    let rendered = String::from_utf8(out).expect("utf8 output");

    assert!(rendered.contains("  1. piped item"), "output: {rendered}");
    assert_eq!(app.list().len(), 1);
    worker.join().expect("worker exits");
}

#[test]
fn stale_fetch_completion_does_not_overwrite_status() {
    let (mut app, _cmd_rx) = app_with_queue(4);
    app.handle_event(StoreEvent::FetchStarted { fetch: 2 });
    app.handle_event(StoreEvent::FetchFinished {
        fetch: 1,
        result: Err(StoreError::Record),
    });
    assert_eq!(app.status(), "");

    app.handle_event(StoreEvent::FetchFinished {
        fetch: 2,
        result: Ok(()),
    });
    assert_eq!(app.status(), "0 item(s)");
}
