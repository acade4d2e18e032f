// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend abstraction
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐
//! │  CaptureSessionManager   │  ← start/stop, surface binding
//! └────────────┬─────────────┘
//!              │ acquire()
//!              ▼
//! ┌──────────────────────────┐
//! │  CameraProvider trait    │  ← async acquisition of the device
//! └────────────┬─────────────┘
//!              │
//!              ▼
//! ┌──────────────────────────┐
//! │  CameraHandle trait      │  ← bind preview + analysis, unbind
//! └──────────────────────────┘
//! ```
//!
//! A bound camera renders its preview into the surface it was given and
//! pushes analysis frames into a [`FrameSink`]. It may ask for a different
//! preview buffer size through [`SurfaceRequester`].

pub mod frame_loop;
pub mod still_image;
pub mod types;

pub use still_image::StillImageCamera;
pub use types::*;

use crate::errors::{CameraError, SurfaceBindError};
use crate::frame_processor::FrameBackpressureQueue;
use crate::surface::{Renegotiation, SurfaceBinding, TextureSurfaceBroker};
use futures::future::BoxFuture;
use std::sync::Arc;

/// Source of camera handles
pub trait CameraProvider: Send + Sync {
    /// Open the camera. Resolves once the device is ready to be bound.
    fn acquire(&self) -> BoxFuture<'static, Result<Box<dyn CameraHandle>, CameraError>>;
}

/// An acquired camera
///
/// `bind` may be called again after `unbind` (the surface can be disposed
/// and recreated while a session is active). `unbind` must be idempotent.
pub trait CameraHandle: Send {
    fn bind(&mut self, binding: CameraBinding) -> Result<(), CameraError>;

    fn unbind(&mut self);
}

/// Everything a camera needs to start producing
#[derive(Debug, Clone)]
pub struct CameraBinding {
    /// Preview output
    pub preview: SurfaceBinding,
    /// Analysis output
    pub frames: FrameSink,
    /// Resize channel for the preview output
    pub surfaces: SurfaceRequester,
}

/// Producer end of a session's frame queue
#[derive(Debug, Clone)]
pub struct FrameSink {
    queue: Arc<FrameBackpressureQueue>,
}

impl FrameSink {
    pub fn new(queue: Arc<FrameBackpressureQueue>) -> Self {
        Self { queue }
    }

    /// Hand a frame to the analysis path. Never blocks.
    pub fn push(&self, frame: CameraFrame) {
        self.queue.push(frame);
    }

    /// Whether the session behind this sink has shut down
    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }
}

/// Lets the camera ask for a differently sized preview surface
#[derive(Debug, Clone)]
pub struct SurfaceRequester {
    broker: Arc<TextureSurfaceBroker>,
}

impl SurfaceRequester {
    pub fn new(broker: Arc<TextureSurfaceBroker>) -> Self {
        Self { broker }
    }

    pub fn request_size(&self, width: u32, height: u32) -> Result<Renegotiation, SurfaceBindError> {
        self.broker.renegotiate(width, height)
    }
}
