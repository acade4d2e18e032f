// SPDX-License-Identifier: GPL-3.0-only

//! Thread lifecycle management for frame loops
//!
//! Both ends of the frame path run a loop on a dedicated OS thread: camera
//! backends that produce frames, and the decode worker that consumes them.
//! [`LoopController`] owns such a thread. Stopping is cooperative: the stop
//! flag is checked between iterations, so a loop blocked inside an
//! iteration must be woken by its owner (e.g. by closing the frame queue).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Action returned by the loop callback to control loop behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Continue running the loop
    Continue,
    /// Stop the loop gracefully
    Stop,
}

/// Drops the exit sender when the thread ends, including on panic
struct ExitNotifier(Option<oneshot::Sender<()>>);

impl Drop for ExitNotifier {
    fn drop(&mut self) {
        if let Some(tx) = self.0.take() {
            let _ = tx.send(());
        }
    }
}

/// Controller for a loop running in a separate thread
pub struct LoopController {
    /// Thread handle for joining
    thread_handle: Option<JoinHandle<()>>,
    /// Signal to stop the loop
    stop_signal: Arc<AtomicBool>,
    /// Resolves once the thread has left its loop
    exited: Option<oneshot::Receiver<()>>,
    /// Name for logging
    name: String,
}

impl LoopController {
    /// Start a new loop in a named thread
    ///
    /// The closure is called repeatedly until it returns `LoopAction::Stop`
    /// or a stop is requested.
    pub fn start<F>(name: &str, mut loop_fn: F) -> std::io::Result<Self>
    where
        F: FnMut() -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop_signal_clone = Arc::clone(&stop_signal);
        let (exit_tx, exit_rx) = oneshot::channel();
        let name_clone = name.to_string();

        info!(name = %name, "Starting frame loop");

        let thread_handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let _notifier = ExitNotifier(Some(exit_tx));
                debug!(name = %name_clone, "Frame loop thread started");

                loop {
                    if stop_signal_clone.load(Ordering::SeqCst) {
                        debug!(name = %name_clone, "Stop signal received");
                        break;
                    }

                    match loop_fn() {
                        LoopAction::Continue => {}
                        LoopAction::Stop => {
                            debug!(name = %name_clone, "Loop requested stop");
                            break;
                        }
                    }
                }

                info!(name = %name_clone, "Frame loop thread exiting");
            })?;

        Ok(Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            exited: Some(exit_rx),
            name: name.to_string(),
        })
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the loop to stop (non-blocking)
    pub fn request_stop(&self) {
        debug!(name = %self.name, "Requesting frame loop stop");
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Stop the loop and block until the thread finishes
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for the thread to finish without sending stop signal
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            debug!(name = %self.name, "Waiting for frame loop thread to finish");
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Frame loop thread panicked: {:?}", e);
            }
        }
    }

    /// Stop the loop, waiting at most `grace` for the thread to exit
    ///
    /// Returns `true` if the thread exited in time. Otherwise the thread is
    /// detached: it keeps its stop signal and finishes whatever iteration
    /// it is in, but nothing waits for it any more.
    pub async fn shutdown(&mut self, grace: Duration) -> bool {
        self.request_stop();

        let Some(exited) = self.exited.take() else {
            self.join();
            return true;
        };

        // A dropped sender (panicked thread) also means the thread is gone
        if tokio::time::timeout(grace, exited).await.is_ok() {
            if let Some(handle) = self.thread_handle.take() {
                let name = self.name.clone();
                match tokio::task::spawn_blocking(move || handle.join()).await {
                    Ok(Err(e)) => warn!(name = %name, "Frame loop thread panicked: {:?}", e),
                    Err(e) => warn!(name = %name, error = %e, "Join task failed"),
                    Ok(Ok(())) => {}
                }
            }
            debug!(name = %self.name, "Frame loop stopped within grace period");
            true
        } else {
            warn!(
                name = %self.name,
                grace_ms = grace.as_millis(),
                "Frame loop did not exit within grace period, detaching"
            );
            self.thread_handle.take();
            false
        }
    }
}

impl Drop for LoopController {
    fn drop(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            self.request_stop();
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                debug!(name = %self.name, "LoopController dropped, detaching running thread");
            }
        }
    }
}

impl std::fmt::Debug for LoopController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopController")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .finish()
    }
}
