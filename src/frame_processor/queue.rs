// SPDX-License-Identifier: GPL-3.0-only

//! Single-slot, latest-wins frame queue
//!
//! The camera produces frames faster than QR detection can consume them.
//! Rather than queueing, the slot holds at most one pending frame and a
//! new push replaces (and releases) whatever was waiting. The decode worker
//! therefore always sees the freshest frame and memory stays bounded.

use crate::backends::camera::CameraFrame;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use tracing::trace;

#[derive(Default)]
struct SlotState {
    pending: Option<CameraFrame>,
    closed: bool,
    pushed: u64,
    dropped: u64,
}

/// Keep-latest backpressure queue between the camera and the decode worker
#[derive(Default)]
pub struct FrameBackpressureQueue {
    slot: Mutex<SlotState>,
    available: Condvar,
}

impl FrameBackpressureQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Offer a frame. Never blocks and never fails.
    ///
    /// An occupied slot has its frame replaced; after `close` the frame is
    /// released straight away.
    pub fn push(&self, frame: CameraFrame) {
        let displaced = {
            let mut slot = self.lock();
            if slot.closed {
                Some(frame)
            } else {
                slot.pushed += 1;
                let previous = slot.pending.replace(frame);
                if previous.is_some() {
                    slot.dropped += 1;
                }
                previous
            }
        };
        self.available.notify_one();

        // Release hooks run outside the lock
        if displaced.is_some() {
            trace!("Dropping displaced frame");
        }
        drop(displaced);
    }

    /// Wait for the most recent frame. Returns `None` once the queue is closed.
    pub fn pop(&self) -> Option<CameraFrame> {
        let mut slot = self.lock();
        loop {
            if slot.closed {
                return None;
            }
            if let Some(frame) = slot.pending.take() {
                return Some(frame);
            }
            slot = self
                .available
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Close the queue: discard the pending frame and wake the consumer
    pub fn close(&self) {
        let discarded = {
            let mut slot = self.lock();
            slot.closed = true;
            slot.pending.take()
        };
        self.available.notify_all();
        drop(discarded);
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Frames accepted since creation
    pub fn pushed_count(&self) -> u64 {
        self.lock().pushed
    }

    /// Frames replaced before the worker got to them
    pub fn dropped_count(&self) -> u64 {
        self.lock().dropped
    }
}

impl std::fmt::Debug for FrameBackpressureQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.lock();
        f.debug_struct("FrameBackpressureQueue")
            .field("occupied", &slot.pending.is_some())
            .field("closed", &slot.closed)
            .field("pushed", &slot.pushed)
            .field("dropped", &slot.dropped)
            .finish()
    }
}
