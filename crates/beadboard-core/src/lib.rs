//! # Beadboard Core
//!
//! Sync engine that mirrors the file-backed beads issue tracker into a
//! live Kanban board and propagates user status changes back through
//! the `bd` CLI.
//!
//! Pipeline: external `bd` mutation → [`watcher`] (notify + trailing
//! debounce, W1) → [`bus`] (typed events + second trailing debounce,
//! W2) → [`store`] silent refresh → [`batches`] recompute → listener
//! notification.
//!
//! ## Laws (Compiler Enforced)
//!
//! - No `unwrap()` - returns `Result` instead
//! - No `expect()` - returns `Result` instead
//! - No `panic!()` - returns `Result` instead
//! - No `unsafe` - safe Rust only
//!
//! ## Error Handling
//!
//! All fallible operations return `Result<T, Error>`. Failures on the
//! silent (watcher-driven) path are logged and swallowed; failures on
//! user-initiated paths propagate to the caller.

pub mod batches;
pub mod bus;
pub mod client;
pub mod config;
pub mod debounce;
mod error;
pub mod model;
pub mod persist;
pub mod store;
pub mod watcher;

pub use batches::compute_batches;
pub use bus::{ChangeBus, ChangeKind, Subscription};
pub use client::{BdClient, IssueClient, JsonlClient};
pub use config::SyncConfig;
pub use error::{Error, Result};
pub use model::{Batch, Issue, IssueStatus, IssueType, IssueWithDeps};
pub use persist::{BoardState, BoardStatePort, FileBoardState, MemoryBoardState};
pub use store::{StoreSubscription, SyncStore};
pub use watcher::{BoardWatcher, WatchSignal, WatchTarget};
