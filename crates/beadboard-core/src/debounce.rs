//! Trailing-edge debounce on tokio timers.
//!
//! The watch layer already coalesces filesystem bursts (W1, via
//! notify-debouncer-mini); this is the second, independent stage (W2)
//! applied at the boundary between the watch layer and subscribers.
//! The two stages are sequential, so worst-case delivery latency is
//! W1 + W2, not max(W1, W2).
//!
//! Trailing-edge semantics: delivery waits for a quiet period of the
//! full window after the LAST signal in a burst, so a signal arriving
//! at the very end of a burst is still observed.

use std::time::Duration;

use tokio::sync::mpsc;

/// Handle to a running debounce task. Signals sent through the handle
/// are coalesced; the callback fires once per burst after the quiet
/// period. Dropping every handle stops the task.
#[derive(Clone)]
pub struct DebounceHandle {
    tx: mpsc::UnboundedSender<()>,
}

impl DebounceHandle {
    /// Record one raw signal. Never blocks; a signal arriving while a
    /// burst is open extends the quiet period.
    pub fn signal(&self) {
        let _ = self.tx.send(());
    }
}

/// Spawn a trailing-edge debounce task with the given quiet window.
///
/// `on_fire` is invoked from the task each time a burst settles.
pub fn spawn<F>(window: Duration, on_fire: F) -> DebounceHandle
where
    F: Fn() + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<()>();

    tokio::spawn(async move {
        // Outer loop: wait for the first signal of a burst
        while rx.recv().await.is_some() {
            // Inner loop: every further signal restarts the window;
            // the burst settles when a full window passes in silence
            loop {
                match tokio::time::timeout(window, rx.recv()).await {
                    Ok(Some(())) => {}
                    Ok(None) => return,
                    Err(_) => break,
                }
            }
            on_fire();
        }
    });

    DebounceHandle { tx }
}
