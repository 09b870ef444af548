//! File watching for the two board targets.
//!
//! Monitors the discovery database file and the beads task-record
//! directory, and emits one tagged signal per target per burst.
//! Bursts are coalesced by a trailing-edge debounce (window W1) so a
//! change at the very end of a burst is still observed.
//!
//! Watch failures for one target are emitted as [`WatchSignal::Error`]
//! and never stop the other target or the process.

use std::path::{Path, PathBuf};

use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEvent, Debouncer};
use tokio::sync::mpsc;

use crate::{config::SyncConfig, Error, Result};

/// Logical watch targets, tagged on every emitted signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchTarget {
    /// The single discovery database file.
    Discovery,
    /// The directory of beads task records.
    Beads,
}

impl WatchTarget {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Discovery => "discovery",
            Self::Beads => "beads",
        }
    }
}

/// Signals delivered to the watcher channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchSignal {
    /// Something under the target changed. No further semantics -
    /// consumers must re-fetch to learn what.
    Changed { target: WatchTarget },
    /// The underlying watch primitive reported an error.
    Error { message: String },
}

/// Watcher over the two board targets.
///
/// Holds the debouncer alive; dropping or calling [`shutdown`]
/// releases the underlying watches.
///
/// [`shutdown`]: BoardWatcher::shutdown
pub struct BoardWatcher {
    debouncer: Option<Debouncer<notify::RecommendedWatcher>>,
    discovery_db: PathBuf,
    beads_dir: PathBuf,
}

impl BoardWatcher {
    /// Start watching the configured targets under a project root.
    ///
    /// Targets that do not exist yet are skipped; use
    /// [`BoardWatcher::watch_created`] to register them once created.
    /// Watching begins immediately; signals arrive on the returned
    /// channel after the W1 debounce window.
    ///
    /// # Errors
    ///
    /// Returns an error if the config fails validation or the watch
    /// primitive cannot be created.
    pub fn start(
        config: &SyncConfig,
        project_root: &Path,
    ) -> Result<(Self, mpsc::Receiver<WatchSignal>)> {
        config.validate()?;

        let discovery_db = config.discovery_db_in(project_root);
        let beads_dir = config.beads_dir_in(project_root);

        let (tx, rx) = mpsc::channel(100);

        let classify_discovery = discovery_db.clone();
        let classify_beads = beads_dir.clone();
        let mut debouncer = new_debouncer(
            config.watch_window(),
            move |res: notify_debouncer_mini::DebounceEventResult| match res {
                Ok(events) => {
                    // One signal per target per burst
                    let mut targets: Vec<WatchTarget> = events
                        .iter()
                        .filter_map(|event| {
                            classify(&classify_discovery, &classify_beads, event)
                        })
                        .collect();
                    targets.sort_by_key(|t| t.as_str());
                    targets.dedup();

                    for target in targets {
                        let _ = tx.blocking_send(WatchSignal::Changed { target });
                    }
                }
                Err(error) => {
                    let _ = tx.blocking_send(WatchSignal::Error {
                        message: error.to_string(),
                    });
                }
            },
        )
        .map_err(|e| Error::io_error(format!("Failed to create file watcher: {e}")))?;

        // Register whichever targets already exist; missing ones are
        // the caller's re-registration problem (watch-for-creation is
        // an explicit operation, not automatic).
        if discovery_db.exists() {
            watch(&mut debouncer, &discovery_db, RecursiveMode::NonRecursive)?;
        }
        if beads_dir.exists() {
            watch(&mut debouncer, &beads_dir, RecursiveMode::Recursive)?;
        }

        Ok((
            Self {
                debouncer: Some(debouncer),
                discovery_db,
                beads_dir,
            },
            rx,
        ))
    }

    /// Register a watch for a target that was created after
    /// [`BoardWatcher::start`] ran.
    ///
    /// # Errors
    ///
    /// Returns `Error::Watch` if the target still does not exist or
    /// the watch cannot be registered, or `Error::Watch` with a
    /// shutdown message if the watcher was already shut down.
    pub fn watch_created(&mut self, target: WatchTarget) -> Result<()> {
        let Some(debouncer) = self.debouncer.as_mut() else {
            return Err(Error::watch(target.as_str(), "watcher is shut down"));
        };

        let (path, mode) = match target {
            WatchTarget::Discovery => (&self.discovery_db, RecursiveMode::NonRecursive),
            WatchTarget::Beads => (&self.beads_dir, RecursiveMode::Recursive),
        };

        if !path.exists() {
            return Err(Error::watch(
                target.as_str(),
                format!("{} does not exist", path.display()),
            ));
        }

        watch(debouncer, path, mode)
    }

    /// Stop watching all targets and release underlying resources.
    /// Idempotent: calling twice is a no-op.
    pub fn shutdown(&mut self) {
        if let Some(debouncer) = self.debouncer.take() {
            drop(debouncer);
            tracing::debug!("board watcher shut down");
        }
    }
}

impl Drop for BoardWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn watch(
    debouncer: &mut Debouncer<notify::RecommendedWatcher>,
    path: &Path,
    mode: RecursiveMode,
) -> Result<()> {
    debouncer
        .watcher()
        .watch(path, mode)
        .map_err(|e| Error::io_error(format!("Failed to watch {}: {e}", path.display())))
}

/// Classify a debounced event against the two target paths.
fn classify(discovery_db: &Path, beads_dir: &Path, event: &DebouncedEvent) -> Option<WatchTarget> {
    if event.path == discovery_db {
        Some(WatchTarget::Discovery)
    } else if event.path.starts_with(beads_dir) {
        Some(WatchTarget::Beads)
    } else {
        None
    }
}
