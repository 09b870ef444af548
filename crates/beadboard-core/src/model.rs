//! Issue model for the board.
//!
//! These types are the canonical in-memory projection of the external
//! beads store. They are owned by [`crate::store::SyncStore`] and
//! mutated only through its operations; external mutation arrives via
//! wholesale refetch, local mutation via the optimistic update path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Issue identifier as assigned by the beads tracker (e.g. `bb-42`).
pub type IssueId = String;

/// Workflow states, ordered by board column position.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    EnumString,
    Display,
    Serialize,
    Deserialize,
    Hash,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum IssueStatus {
    #[strum(to_string = "open")]
    Open,

    #[strum(to_string = "in_progress")]
    #[serde(rename = "in_progress", alias = "inprogress")]
    InProgress,

    #[strum(to_string = "blocked")]
    Blocked,

    #[strum(to_string = "deferred")]
    Deferred,

    #[strum(to_string = "closed")]
    Closed,
}

impl IssueStatus {
    /// All statuses in board column order.
    pub const ALL: [Self; 5] = [
        Self::Open,
        Self::InProgress,
        Self::Blocked,
        Self::Deferred,
        Self::Closed,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, Serialize, Deserialize, Hash)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    #[strum(to_string = "bug")]
    Bug,

    #[strum(to_string = "feature")]
    Feature,

    #[strum(to_string = "task")]
    Task,

    #[strum(to_string = "epic")]
    Epic,

    #[strum(to_string = "chore")]
    Chore,
}

/// A single trackable work item from the external store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub title: String,
    pub status: IssueStatus,
    #[serde(alias = "type")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<IssueType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<IssueId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl Issue {
    /// Whether this issue may have child issues (a root for the
    /// dependency/batch view).
    #[must_use]
    pub fn is_epic(&self) -> bool {
        self.issue_type == Some(IssueType::Epic)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.status == IssueStatus::Closed
    }
}

/// An [`Issue`] augmented with its outgoing dependency edges.
///
/// Only populated while a root epic is selected; edges may be cyclic
/// at the data level - cycle handling is the batch projector's concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueWithDeps {
    #[serde(flatten)]
    pub issue: Issue,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<IssueId>,
}

impl IssueWithDeps {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.issue.id
    }
}

/// One execution layer of the dependency graph rooted at an epic.
///
/// Fully derived: recomputed wholesale whenever its inputs change,
/// never patched incrementally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub index: usize,
    pub issues: Vec<IssueWithDeps>,
}
