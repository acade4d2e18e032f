// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Pixel layout of a frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    RGBA,
    /// Gray8 - 8-bit grayscale (single channel)
    Gray8,
    /// NV12 - Semi-planar 4:2:0 (Y plane + interleaved UV plane)
    /// Native analysis format on most mobile sensors
    NV12,
    /// NV21 - Semi-planar 4:2:0 (Y plane + interleaved VU plane)
    NV21,
}

impl PixelFormat {
    /// Bytes per pixel in the first (luma or packed) plane
    pub fn primary_plane_bpp(&self) -> u32 {
        match self {
            PixelFormat::RGBA => 4,
            PixelFormat::Gray8 | PixelFormat::NV12 | PixelFormat::NV21 => 1,
        }
    }
}

/// Sensor rotation in degrees (clockwise)
///
/// Camera sensors may be physically mounted at various angles relative to the device.
/// This is common on mobile devices where sensors are rotated 90° or 270° relative
/// to the display orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SensorRotation {
    /// No rotation (sensor is oriented correctly)
    #[default]
    None,
    /// 90 degrees clockwise
    Rotate90,
    /// 180 degrees (upside down)
    Rotate180,
    /// 270 degrees clockwise (90 degrees counter-clockwise)
    Rotate270,
}

impl SensorRotation {
    /// Create rotation from an integer degree value (normalised to 0-360).
    pub fn from_degrees_int(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            90 => SensorRotation::Rotate90,
            180 => SensorRotation::Rotate180,
            270 => SensorRotation::Rotate270,
            _ => SensorRotation::None,
        }
    }

    /// Get the rotation in degrees
    pub fn degrees(&self) -> u32 {
        match self {
            SensorRotation::None => 0,
            SensorRotation::Rotate90 => 90,
            SensorRotation::Rotate180 => 180,
            SensorRotation::Rotate270 => 270,
        }
    }
}

impl std::fmt::Display for SensorRotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Hook returning a frame's buffer to its producer
pub type ReleaseHook = Box<dyn FnOnce() + Send>;

/// A single camera frame handed to the analysis path
///
/// The frame owns its producer-side buffer. Whatever happens to the frame
/// (decoded, replaced in the queue, discarded on shutdown) the release hook
/// runs exactly once, when the frame is dropped.
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// Pixel data: RGBA pixels, grayscale, or Y plane followed by chroma
    pub data: Arc<[u8]>,
    /// Pixel format of the data
    pub format: PixelFormat,
    /// Row stride of the first plane (bytes per row, may include padding)
    pub stride: u32,
    /// Rotation reported by the sensor for this frame
    pub rotation: SensorRotation,
    /// Timestamp when frame was captured (for latency diagnostics)
    pub captured_at: Instant,
    release: Option<ReleaseHook>,
}

impl CameraFrame {
    /// Create a tightly packed frame with no release hook
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Arc<[u8]>) -> Self {
        Self {
            width,
            height,
            data,
            format,
            stride: width.saturating_mul(format.primary_plane_bpp()),
            rotation: SensorRotation::None,
            captured_at: Instant::now(),
            release: None,
        }
    }

    /// Override the row stride
    pub fn with_stride(mut self, stride: u32) -> Self {
        self.stride = stride;
        self
    }

    /// Set the sensor rotation
    pub fn with_rotation(mut self, rotation: SensorRotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Attach a hook that runs when the frame is released
    pub fn on_release<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.release = Some(Box::new(hook));
        self
    }
}

impl Drop for CameraFrame {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for CameraFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("stride", &self.stride)
            .field("bytes", &self.data.len())
            .field("rotation", &self.rotation)
            .finish()
    }
}
