//! Persisted board UI state.
//!
//! Small key-value style port for the bits of UI state that survive a
//! restart: which batches the user collapsed and which root was
//! selected. The store talks to [`BoardStatePort`] and never touches
//! storage directly; the file-backed impl writes
//! `.beadboard/state.json` under the project root.

use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{model::IssueId, Error, Result};

/// Relative path of the state file under the project root.
pub const STATE_PATH: &str = ".beadboard/state.json";

/// UI state persisted across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardState {
    /// Indices of batches the user collapsed.
    #[serde(default)]
    pub collapsed_batches: BTreeSet<usize>,
    /// Root selected when the board was last open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_root: Option<IssueId>,
}

/// Injected persistence port for [`BoardState`].
pub trait BoardStatePort: Send + Sync {
    /// Load the persisted state; missing state loads as default.
    fn load(&self) -> Result<BoardState>;

    /// Persist the state.
    fn save(&self, state: &BoardState) -> Result<()>;
}

/// File-backed implementation under a project root.
pub struct FileBoardState {
    path: PathBuf,
}

impl FileBoardState {
    #[must_use]
    pub fn new(project_root: &Path) -> Self {
        Self {
            path: project_root.join(STATE_PATH),
        }
    }
}

impl BoardStatePort for FileBoardState {
    fn load(&self) -> Result<BoardState> {
        if !self.path.exists() {
            return Ok(BoardState::default());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|source| {
            Error::FileReadFailed {
                path: self.path.clone(),
                source,
            }
        })?;

        serde_json::from_str(&content)
            .map_err(|e| Error::io_error(format!("Corrupt board state: {e}")))
    }

    fn save(&self, state: &BoardState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::io_error(format!("Failed to create state dir: {e}")))?;
        }

        let content = serde_json::to_string_pretty(state)
            .map_err(|e| Error::io_error(format!("Failed to encode board state: {e}")))?;
        std::fs::write(&self.path, content)
            .map_err(|e| Error::io_error(format!("Failed to write board state: {e}")))
    }
}

/// In-memory port for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryBoardState {
    state: std::sync::Mutex<BoardState>,
}

impl BoardStatePort for MemoryBoardState {
    fn load(&self) -> Result<BoardState> {
        Ok(self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone())
    }

    fn save(&self, state: &BoardState) -> Result<()> {
        *self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = state.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_loads_default() -> Result<()> {
        let Ok(dir) = tempfile::tempdir() else {
            return Ok(());
        };

        let port = FileBoardState::new(dir.path());
        assert_eq!(port.load()?, BoardState::default());
        Ok(())
    }

    #[test]
    fn test_save_then_load_roundtrip() -> Result<()> {
        let Ok(dir) = tempfile::tempdir() else {
            return Ok(());
        };

        let port = FileBoardState::new(dir.path());
        let mut state = BoardState::default();
        state.collapsed_batches.insert(0);
        state.collapsed_batches.insert(3);
        state.selected_root = Some("bb-9".to_string());

        port.save(&state)?;
        assert_eq!(port.load()?, state);
        Ok(())
    }

    #[test]
    fn test_corrupt_state_is_an_error() -> Result<()> {
        let Ok(dir) = tempfile::tempdir() else {
            return Ok(());
        };

        let state_dir = dir.path().join(".beadboard");
        std::fs::create_dir_all(&state_dir)?;
        std::fs::write(state_dir.join("state.json"), "not json")?;

        let port = FileBoardState::new(dir.path());
        assert!(port.load().is_err());
        Ok(())
    }

    #[test]
    fn test_memory_port_roundtrip() -> Result<()> {
        let port = MemoryBoardState::default();
        let mut state = BoardState::default();
        state.collapsed_batches.insert(1);

        port.save(&state)?;
        assert_eq!(port.load()?, state);
        Ok(())
    }
}
