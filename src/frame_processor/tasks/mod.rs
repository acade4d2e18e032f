// SPDX-License-Identifier: GPL-3.0-only

//! Frame processing tasks
//!
//! This module contains the decoder abstraction and its implementations.

pub mod qr_detector;

pub use qr_detector::QrDetector;

use crate::backends::camera::CameraFrame;
use crate::errors::DecodeError;
use crate::frame_processor::types::Decoded;

/// The opaque decode capability run by the decode worker
///
/// `Ok(None)` means the frame held nothing decodable. Both that and `Err`
/// simply drop the frame; the worker moves on to the next one.
pub trait FrameDecoder: Send + Sync {
    fn decode(&self, frame: &CameraFrame) -> Result<Option<Decoded>, DecodeError>;
}

impl<F> FrameDecoder for F
where
    F: Fn(&CameraFrame) -> Result<Option<Decoded>, DecodeError> + Send + Sync,
{
    fn decode(&self, frame: &CameraFrame) -> Result<Option<Decoded>, DecodeError> {
        self(frame)
    }
}
