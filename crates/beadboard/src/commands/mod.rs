//! Subcommand implementations.

pub mod board;
pub mod update;
pub mod watch;

use std::{path::Path, sync::Arc};

use anyhow::{bail, Result};

use beadboard_core::{BdClient, FileBoardState, Issue, IssueClient, JsonlClient, SyncStore};

/// Pick the best available issue client: the `bd` CLI when installed,
/// otherwise read-only access to the JSONL export.
fn make_client(project_root: &Path) -> Arc<dyn IssueClient> {
    match BdClient::discover(project_root) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::warn!(error = %e, "bd CLI not found, using read-only JSONL access");
            Arc::new(JsonlClient::new(project_root))
        }
    }
}

pub(crate) fn make_store(project_root: &Path) -> Arc<SyncStore> {
    Arc::new(SyncStore::new(
        Some(project_root.to_path_buf()),
        make_client(project_root),
        Arc::new(FileBoardState::new(project_root)),
    ))
}

/// Look up an epic by id in the fetched list.
pub(crate) fn find_epic(store: &SyncStore, root_id: &str) -> Result<Issue> {
    let Some(root) = store.issues().iter().find(|i| i.id == root_id).cloned() else {
        bail!("no issue with id '{root_id}'");
    };
    if !root.is_epic() {
        bail!("'{root_id}' is not an epic; only epics can root the batch view");
    }
    Ok(root)
}
