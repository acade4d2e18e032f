// SPDX-License-Identifier: GPL-3.0-only

//! Frame processor module for QR scanning
//!
//! Camera frames enter through a keep-latest [`FrameBackpressureQueue`] and
//! are decoded one at a time by the session's [`DecodeWorker`].

pub mod dispatcher;
pub mod queue;
pub mod tasks;
pub mod types;

pub use dispatcher::{DecodeDispatcher, DecodeWorker, EventGate, ScanEventSender, ScanEvents};
pub use queue::FrameBackpressureQueue;
pub use tasks::{FrameDecoder, QrDetector};
pub use types::{BarcodeFormat, Decoded, ScanResult};
