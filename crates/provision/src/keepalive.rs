//! Background refresh of an elevated session
//!
//! Long runs outlive the `sudo` timestamp. The keep-alive wakes periodically
//! and refreshes the session so later privileged steps don't re-prompt. It
//! is owned by the runner and stopped when the run ends, whatever the
//! outcome.

use crate::context::Elevation;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Handle to a running keep-alive thread
///
/// Stopping (explicitly or on drop) wakes the thread immediately and joins it.
pub struct KeepAlive {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<usize>>,
}

impl KeepAlive {
    /// Spawn the refresh loop
    pub fn start(elevation: Arc<dyn Elevation>, interval: Duration) -> Self {
        let (tx, rx) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("provision-keepalive".to_string())
            .spawn(move || {
                let mut refreshes = 0;
                loop {
                    match rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            refreshes += 1;
                            match elevation.refresh() {
                                Ok(()) => log::trace!("elevated session refreshed"),
                                Err(e) => log::warn!("Failed to refresh elevated session: {e:#}"),
                            }
                        }
                        // Stop requested or owner gone
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                refreshes
            });

        let handle = match handle {
            Ok(h) => Some(h),
            Err(e) => {
                log::warn!("Could not start keep-alive thread: {e}");
                None
            }
        };

        Self {
            stop: Some(tx),
            handle,
        }
    }

    /// Cancel the loop and wait for it; returns how many refreshes ran
    pub fn stop(mut self) -> usize {
        self.shutdown()
    }

    fn shutdown(&mut self) -> usize {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(());
        }
        self.handle
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or(0)
    }
}

impl Drop for KeepAlive {
    fn drop(&mut self) {
        self.shutdown();
    }
}
