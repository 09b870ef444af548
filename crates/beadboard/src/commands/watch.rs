//! `beadboard watch` - live board driven by the sync pipeline.
//!
//! Wires the full chain: filesystem watcher → raw signals → debouncing
//! change bus → silent store refresh → re-render. Runs until Ctrl-C.

use std::{path::Path, sync::Arc};

use anyhow::Result;
use clap::ArgMatches;

use beadboard_core::{BoardWatcher, ChangeBus, SyncConfig, SyncStore, WatchSignal};

use crate::{commands, render};

#[allow(clippy::print_stdout)]
fn draw(store: &SyncStore) {
    // ANSI clear + home keeps the board in place between refreshes
    print!("\x1b[2J\x1b[H");
    match store.selected_root() {
        Some(root) => {
            let batches = store.batches();
            print!("{}", render::render_batches(&root.id, &batches, store));
        }
        None => {
            let issues: Vec<_> = store.issues().iter().cloned().collect();
            print!("{}", render::render_board(&issues));
        }
    }
    if let Some(error) = store.last_error() {
        println!("\n! {error}");
    }
}

pub async fn run(project_root: &Path, matches: &ArgMatches) -> Result<()> {
    let config = SyncConfig::load(project_root)?;
    let store = commands::make_store(project_root);

    let bus = ChangeBus::new(config.notify_window());
    let subscription = store.subscribe_to_changes(&bus);

    let (mut watcher, mut signals) = BoardWatcher::start(&config, project_root)?;
    let forwarder = tokio::spawn(async move {
        while let Some(signal) = signals.recv().await {
            match signal {
                WatchSignal::Changed { target } => bus.publish_raw(target.into()),
                WatchSignal::Error { message } => {
                    tracing::warn!(%message, "filesystem watch error");
                }
            }
        }
    });

    // Re-render on every committed state change. Weak reference:
    // the store must not keep itself alive through its own listener.
    let weak = Arc::downgrade(&store);
    store.subscribe_listener(move || {
        if let Some(store) = weak.upgrade() {
            draw(&store);
        }
    });

    store.fetch_issues(false).await?;
    if let Some(root_id) = matches.get_one::<String>("root") {
        let root = commands::find_epic(&store, root_id)?;
        store.select_root(Some(root)).await;
    } else if let Some(root_id) = store.persisted_root_id() {
        // Restore the epic selected in the previous session, if it
        // still exists and is still an epic
        if let Ok(root) = commands::find_epic(&store, &root_id) {
            store.select_root(Some(root)).await;
        }
    }
    draw(&store);

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down watch pipeline");

    subscription.unsubscribe();
    watcher.shutdown();
    forwarder.abort();
    Ok(())
}
