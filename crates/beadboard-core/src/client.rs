//! External issue-store port.
//!
//! The board never touches beads storage directly; everything goes
//! through [`IssueClient`]. Two implementations:
//!
//! - [`BdClient`]: shells out to the `bd` CLI (`bd list --json`,
//!   `bd update <id> --status <s>`, ...). The production path.
//! - [`JsonlClient`]: reads `.beads/issues.jsonl` directly. Read-only
//!   fallback for repos where `bd` is not installed.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use im::Vector;

use crate::{
    model::{Issue, IssueStatus, IssueWithDeps},
    Error, Result,
};

/// Relative path of the JSONL export under a project root.
pub const ISSUES_JSONL: &str = ".beads/issues.jsonl";

/// Asynchronous port to the external issue store.
#[async_trait]
pub trait IssueClient: Send + Sync {
    /// Fetch the full current issue list.
    async fn list(&self) -> Result<Vector<Issue>>;

    /// Fetch a single issue by id.
    async fn get(&self, id: &str) -> Result<Issue>;

    /// Fetch the dependency-annotated issue list.
    async fn list_with_deps(&self) -> Result<Vector<IssueWithDeps>>;

    /// Ask the external store to change an issue's status.
    async fn update_status(&self, id: &str, status: IssueStatus) -> Result<()>;
}

// ───────────────────────────────────────────────────────────────────
// bd CLI client
// ───────────────────────────────────────────────────────────────────

/// Client that drives the `bd` CLI as a subprocess.
pub struct BdClient {
    bin: PathBuf,
    project_root: PathBuf,
}

impl BdClient {
    /// Locate `bd` on PATH and bind it to a project root.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` with install guidance if `bd` is not
    /// on PATH.
    pub fn discover(project_root: impl Into<PathBuf>) -> Result<Self> {
        let bin = which::which("bd").map_err(|_| {
            Error::not_found(
                "bd CLI not found on PATH. Install beads first: \
                 https://github.com/steveyegge/beads",
            )
        })?;

        Ok(Self {
            bin,
            project_root: project_root.into(),
        })
    }

    /// Bind an explicit `bd` binary to a project root (for tests and
    /// non-standard installs).
    pub fn with_binary(bin: impl Into<PathBuf>, project_root: impl Into<PathBuf>) -> Self {
        Self {
            bin: bin.into(),
            project_root: project_root.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        let output = tokio::process::Command::new(&self.bin)
            .args(args)
            .current_dir(&self.project_root)
            .output()
            .await
            .map_err(|e| Error::io_error(format!("Failed to execute bd: {e}")))?;

        if !output.status.success() {
            return Err(Error::io_error(format!(
                "bd {} failed: {}",
                args.first().copied().unwrap_or(""),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| Error::io_error(format!("bd produced invalid UTF-8: {e}")))
    }
}

#[async_trait]
impl IssueClient for BdClient {
    async fn list(&self) -> Result<Vector<Issue>> {
        let stdout = self
            .run(&["list", "--json"])
            .await
            .map_err(|e| Error::fetch(e.to_string()))?;

        let issues: Vec<Issue> = serde_json::from_str(&stdout)
            .map_err(|e| Error::fetch(format!("Failed to parse bd list output: {e}")))?;
        Ok(issues.into_iter().collect())
    }

    async fn get(&self, id: &str) -> Result<Issue> {
        let stdout = self
            .run(&["show", id, "--json"])
            .await
            .map_err(|_| Error::not_found(id.to_string()))?;

        serde_json::from_str(&stdout)
            .map_err(|e| Error::fetch(format!("Failed to parse bd show output: {e}")))
    }

    async fn list_with_deps(&self) -> Result<Vector<IssueWithDeps>> {
        let stdout = self
            .run(&["list", "--json", "--with-deps"])
            .await
            .map_err(|e| Error::derived_fetch(e.to_string()))?;

        let issues: Vec<IssueWithDeps> = serde_json::from_str(&stdout)
            .map_err(|e| Error::derived_fetch(format!("Failed to parse bd output: {e}")))?;
        Ok(issues.into_iter().collect())
    }

    async fn update_status(&self, id: &str, status: IssueStatus) -> Result<()> {
        self.run(&["update", id, "--status", &status.to_string()])
            .await
            .map(|_| ())
            .map_err(|e| Error::update(id, e.to_string()))
    }
}

// ───────────────────────────────────────────────────────────────────
// JSONL fallback client
// ───────────────────────────────────────────────────────────────────

/// Read-only client over the `.beads/issues.jsonl` export.
pub struct JsonlClient {
    project_root: PathBuf,
}

impl JsonlClient {
    #[must_use]
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }
}

#[async_trait]
impl IssueClient for JsonlClient {
    async fn list(&self) -> Result<Vector<Issue>> {
        let with_deps = read_issues_jsonl(&self.project_root)?;
        Ok(with_deps.into_iter().map(|i| i.issue).collect())
    }

    async fn get(&self, id: &str) -> Result<Issue> {
        read_issues_jsonl(&self.project_root)?
            .into_iter()
            .map(|i| i.issue)
            .find(|issue| issue.id == id)
            .ok_or_else(|| Error::not_found(id.to_string()))
    }

    async fn list_with_deps(&self) -> Result<Vector<IssueWithDeps>> {
        read_issues_jsonl(&self.project_root).map_err(|e| Error::derived_fetch(e.to_string()))
    }

    async fn update_status(&self, id: &str, _status: IssueStatus) -> Result<()> {
        Err(Error::update(
            id,
            "the JSONL export is read-only; install the bd CLI to change issues",
        ))
    }
}

/// Read all issues from the workspace JSONL export.
///
/// Returns an empty vector if the file doesn't exist (valid case for
/// uninitialized repos).
///
/// # Errors
///
/// Returns `Error::FileReadFailed` if the file cannot be read, or
/// `Error::JsonParseFailed` if any line contains invalid JSON.
pub fn read_issues_jsonl(project_root: &Path) -> Result<Vector<IssueWithDeps>> {
    let jsonl_path = project_root.join(ISSUES_JSONL);

    if !jsonl_path.exists() {
        return Ok(Vector::new());
    }

    let content = std::fs::read_to_string(&jsonl_path).map_err(|source| Error::FileReadFailed {
        path: jsonl_path.clone(),
        source,
    })?;

    let issues: Vector<IssueWithDeps> = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str::<IssueWithDeps>(line).map_err(|source| Error::JsonParseFailed {
                line: index.saturating_add(1),
                source,
            })
        })
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .collect();

    Ok(issues)
}
