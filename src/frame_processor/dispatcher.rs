// SPDX-License-Identifier: GPL-3.0-only

//! Decode dispatch
//!
//! One [`DecodeWorker`] runs per active session. It pops frames from the
//! session's [`FrameBackpressureQueue`], runs the decoder on each, and
//! emits a [`ScanResult`] for every hit. Emission goes through an
//! [`EventGate`] so that once the session starts shutting down, a decode
//! still in flight cannot deliver its result.

use super::queue::FrameBackpressureQueue;
use super::tasks::FrameDecoder;
use super::types::ScanResult;
use crate::backends::camera::frame_loop::{LoopAction, LoopController};
use crate::backends::camera::CameraFrame;
use crate::constants::timing::FRAME_LOG_INTERVAL;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Sender half of the scan event stream
pub type ScanEventSender = mpsc::UnboundedSender<ScanResult>;

/// Receiver half of the scan event stream handed to the caller
pub type ScanEvents = mpsc::UnboundedReceiver<ScanResult>;

/// Closable path from the decode worker to the caller
///
/// Checking and sending happen under one lock, and `close` takes the same
/// lock, so after `close` returns no further event can be sent.
#[derive(Debug)]
pub struct EventGate {
    sender: Mutex<Option<ScanEventSender>>,
}

impl EventGate {
    pub fn new(sender: ScanEventSender) -> Self {
        Self {
            sender: Mutex::new(Some(sender)),
        }
    }

    /// Deliver a result if the gate is still open. Returns whether it was sent.
    pub fn emit(&self, result: ScanResult) -> bool {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        match sender.as_ref() {
            Some(tx) => tx.send(result).is_ok(),
            None => {
                debug!(content = %result.content(), "Discarding scan result after stop");
                false
            }
        }
    }

    pub fn close(&self) {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn is_open(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// Runs the decoder on frames and forwards hits
pub struct DecodeDispatcher {
    decoder: Arc<dyn FrameDecoder>,
    gate: Arc<EventGate>,
    processed: u64,
}

impl DecodeDispatcher {
    pub fn new(decoder: Arc<dyn FrameDecoder>, gate: Arc<EventGate>) -> Self {
        Self {
            decoder,
            gate,
            processed: 0,
        }
    }

    /// Decode one frame. The frame is released when this returns, whatever
    /// the outcome.
    pub fn process(&mut self, frame: CameraFrame) {
        self.processed += 1;
        if self.processed % FRAME_LOG_INTERVAL == 0 {
            debug!(processed = self.processed, "Decode worker progress");
        }

        match self.decoder.decode(&frame) {
            Ok(Some(decoded)) => {
                let result = ScanResult::new(decoded);
                debug!(content = %result.content(), format = %result.format(), "Scan result");
                self.gate.emit(result);
            }
            Ok(None) => trace!("No code in frame"),
            Err(e) => debug!(error = %e, "Decode failed, dropping frame"),
        }
        drop(frame);
    }

    /// Frames handed to the decoder so far
    pub fn processed(&self) -> u64 {
        self.processed
    }
}

/// The single decode thread of a session
pub struct DecodeWorker {
    controller: LoopController,
    queue: Arc<FrameBackpressureQueue>,
    gate: Arc<EventGate>,
}

impl DecodeWorker {
    /// Spawn the worker thread. It blocks in `pop` until frames arrive.
    pub fn spawn(
        name: &str,
        queue: Arc<FrameBackpressureQueue>,
        mut dispatcher: DecodeDispatcher,
    ) -> std::io::Result<Self> {
        let gate = Arc::clone(&dispatcher.gate);
        let source = Arc::clone(&queue);
        let controller = LoopController::start(name, move || match source.pop() {
            Some(frame) => {
                dispatcher.process(frame);
                LoopAction::Continue
            }
            None => LoopAction::Stop,
        })?;

        Ok(Self {
            controller,
            queue,
            gate,
        })
    }

    /// Synchronous half of shutdown: no more results, no more frames
    ///
    /// Closes the event gate first so a decode in progress is discarded,
    /// then closes the queue, which drops any pending frame and wakes a
    /// worker blocked in `pop`.
    pub fn signal_stop(&self) {
        self.gate.close();
        self.queue.close();
        self.controller.request_stop();
    }

    /// Stop and wait up to `grace` for the thread; see [`LoopController::shutdown`]
    pub async fn shutdown(mut self, grace: Duration) -> bool {
        self.signal_stop();
        self.controller.shutdown(grace).await
    }

    pub fn is_running(&self) -> bool {
        self.controller.is_running()
    }
}

impl Drop for DecodeWorker {
    fn drop(&mut self) {
        self.signal_stop();
    }
}

impl std::fmt::Debug for DecodeWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeWorker")
            .field("controller", &self.controller)
            .field("queue", &self.queue)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::PixelFormat;
    use crate::errors::DecodeError;
    use crate::frame_processor::types::Decoded;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn text_frame(text: &str) -> CameraFrame {
        CameraFrame::new(
            text.len() as u32,
            1,
            PixelFormat::Gray8,
            Arc::from(text.as_bytes()),
        )
    }

    /// Decoder that reads the frame bytes back as the code content
    fn echo_decoder(seen: Arc<Mutex<Vec<String>>>) -> Arc<dyn FrameDecoder> {
        Arc::new(move |frame: &CameraFrame| {
            let text = String::from_utf8_lossy(&frame.data).to_string();
            seen.lock().unwrap().push(text.clone());
            match text.as_str() {
                "" => Ok(None),
                "bad" => Err(DecodeError::Backend("unreadable".into())),
                _ => Ok(Some(Decoded::qr(text))),
            }
        })
    }

    #[test]
    fn test_dispatcher_emits_only_hits_and_releases_every_frame() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let released = Arc::new(AtomicUsize::new(0));
        let mut dispatcher =
            DecodeDispatcher::new(echo_decoder(seen), Arc::new(EventGate::new(tx)));

        for text in ["", "bad", "hello"] {
            let counter = Arc::clone(&released);
            dispatcher.process(text_frame(text).on_release(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }

        assert_eq!(released.load(Ordering::SeqCst), 3);
        assert_eq!(dispatcher.processed(), 3);
        assert_eq!(rx.try_recv().unwrap().content(), "hello");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_gate_discards_results() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let gate = EventGate::new(tx);
        gate.close();
        assert!(!gate.is_open());
        assert!(!gate.emit(ScanResult::new(Decoded::qr("late"))));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_only_latest_of_queued_frames_is_decoded() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let queue = Arc::new(FrameBackpressureQueue::new());

        // Queue three frames before the worker's first pop
        for text in ["frame-1", "frame-2", "frame-3"] {
            queue.push(text_frame(text));
        }

        let dispatcher =
            DecodeDispatcher::new(echo_decoder(Arc::clone(&seen)), Arc::new(EventGate::new(tx)));
        let worker = DecodeWorker::spawn("test-decode", Arc::clone(&queue), dispatcher).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("scan result in time")
            .expect("channel open");
        assert_eq!(result.content(), "frame-3");

        assert!(worker.shutdown(Duration::from_millis(1000)).await);
        assert_eq!(*seen.lock().unwrap(), vec!["frame-3".to_string()]);
        assert_eq!(queue.dropped_count(), 2);
    }
}
