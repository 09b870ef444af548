//! Error types for the sync engine, categorized by propagation policy:
//!
//! - `Fetch`: issue list retrieval failed - user-visible, recorded on the store
//! - `Update`: optimistic status change rejected - triggers rollback, re-raised
//! - `DerivedFetch`: dependency/batch refresh failed - logged only
//! - `Watch`: one watch target failed - logged, other targets keep running
//!
//! Nothing here is fatal to the process; every failure path leaves the
//! store in a previously-valid, renderable state.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to fetch issues: {0}")]
    Fetch(String),

    #[error("Failed to update issue '{id}': {reason}")]
    Update { id: String, reason: String },

    #[error("Dependency view refresh failed: {0}")]
    DerivedFetch(String),

    #[error("Watch error on {target}: {reason}")]
    Watch { target: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Issue not found: {0}")]
    NotFound(String),

    #[error("Failed to read file {path}: {source}")]
    FileReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse JSON at line {line}: {source}")]
    JsonParseFailed {
        line: usize,
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(String),
}

// Convenience constructors, one per category
impl Error {
    /// Create a fetch error (user-visible, recorded on the store).
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Create an update error for a rejected status change.
    pub fn update(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Update {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create a derived-fetch error (logged, never surfaced).
    pub fn derived_fetch(msg: impl Into<String>) -> Self {
        Self::DerivedFetch(msg.into())
    }

    /// Create a watch error for a single target.
    pub fn watch(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Watch {
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Create a validation error from an invalid config.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an error for a missing issue or binary.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a system error from an IO failure.
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Whether this error is on the silent path (never surfaced to the
    /// user beyond a log line).
    #[must_use]
    pub const fn is_silent(&self) -> bool {
        matches!(self, Self::DerivedFetch(_) | Self::Watch { .. })
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::io_error(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::invalid_config(format!("Failed to parse config: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_fetch() {
        let err = Error::fetch("bd exited with status 1");
        assert_eq!(
            err.to_string(),
            "Failed to fetch issues: bd exited with status 1"
        );
    }

    #[test]
    fn test_error_display_update() {
        let err = Error::update("bb-12", "bd not reachable");
        assert_eq!(
            err.to_string(),
            "Failed to update issue 'bb-12': bd not reachable"
        );
    }

    #[test]
    fn test_error_display_invalid_config() {
        let err = Error::invalid_config("test error");
        assert_eq!(err.to_string(), "Invalid configuration: test error");
    }

    #[test]
    fn test_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_silent_categories() {
        assert!(Error::derived_fetch("x").is_silent());
        assert!(Error::watch("beads", "gone").is_silent());
        assert!(!Error::fetch("x").is_silent());
        assert!(!Error::update("id", "x").is_silent());
    }
}
