//! `beadboard update` - optimistic status change.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;

use beadboard_core::IssueStatus;

use crate::commands;

#[allow(clippy::print_stdout)]
pub async fn run(project_root: &Path, matches: &ArgMatches) -> Result<()> {
    let id = matches
        .get_one::<String>("id")
        .ok_or_else(|| anyhow!("issue id is required"))?;
    let status: IssueStatus = matches
        .get_one::<String>("status")
        .ok_or_else(|| anyhow!("--status is required"))?
        .parse()
        .map_err(|_| {
            anyhow!("invalid status; expected one of: open, in_progress, blocked, deferred, closed")
        })?;

    let store = commands::make_store(project_root);
    store.fetch_issues(false).await?;

    let previous = store.status_of(id);
    store
        .update_status(id, status)
        .await
        .with_context(|| format!("failed to update {id}"))?;

    match previous {
        Some(previous) => println!("{id}: {previous} → {status}"),
        None => println!("{id}: → {status}"),
    }
    Ok(())
}
