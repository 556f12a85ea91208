mod app;
mod config;
mod input;

use std::{
    io::{self, BufRead},
    path::PathBuf,
    sync::Arc,
    thread,
};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use client_core::{
    launch, HttpRecordDatabase, InMemoryRecordDatabase, RecordDatabase, RemoteStore, StoreCommand,
};
use crossbeam_channel::{bounded, unbounded, Receiver};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{app::App, config::load_settings, input::HELP};

const COMMAND_QUEUE_CAPACITY: usize = 64;

#[derive(Parser, Debug)]
struct Args {
    /// Record store base url; overrides the config file and APP__SERVER_URL.
    #[arg(long)]
    server_url: Option<String>,
    /// Keep records in this process instead of talking to a server.
    #[arg(long)]
    in_memory: bool,
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = load_settings(args.config.as_deref());
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .init();

    let database: Arc<dyn RecordDatabase> = if args.in_memory {
        info!("using in-memory record store");
        Arc::new(InMemoryRecordDatabase::new())
    } else {
        info!(server_url = %settings.server_url, "using remote record store");
        Arc::new(HttpRecordDatabase::new(&settings.server_url)?)
    };

    let (cmd_tx, cmd_rx) = bounded(COMMAND_QUEUE_CAPACITY);
    let (ui_tx, ui_rx) = unbounded();
    let worker = launch(RemoteStore::new(database), cmd_rx, ui_tx)
        .context("failed to start store worker")?;

    let mut stdout = io::stdout();
    println!("{HELP}");
    let mut app = App::new(cmd_tx);
    app.dispatch(StoreCommand::FetchList);
    app.run(spawn_stdin_reader(), ui_rx, &mut stdout)?;

    // Dropping the last command sender lets the worker drain and exit.
    drop(app);
    worker
        .join()
        .map_err(|_| anyhow!("store worker panicked"))?;
    Ok(())
}

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = unbounded();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    warn!("failed to read input: {err}");
                    break;
                }
            }
        }
    });
    rx
}
