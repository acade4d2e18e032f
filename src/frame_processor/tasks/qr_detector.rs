// SPDX-License-Identifier: GPL-3.0-only

//! QR code detection task
//!
//! This module implements the default decode capability using the rqrr
//! crate. Frames are reduced to a luma plane (stride padding removed,
//! optionally downscaled) and searched for QR grids. The first grid that
//! decodes wins.

use super::FrameDecoder;
use crate::backends::camera::{CameraFrame, PixelFormat};
use crate::constants::decode::MAX_DIMENSION;
use crate::errors::DecodeError;
use crate::frame_processor::types::Decoded;
use tracing::{debug, trace};

/// QR code detector
///
/// Optimized for real-time processing with frame downscaling.
#[derive(Debug, Clone)]
pub struct QrDetector {
    /// Maximum dimension for processing (frames are downscaled to this)
    max_dimension: u32,
}

impl Default for QrDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl QrDetector {
    pub fn new() -> Self {
        Self {
            max_dimension: MAX_DIMENSION,
        }
    }

    /// Create a QR detector with custom max dimension
    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
        }
    }
}

impl FrameDecoder for QrDetector {
    fn decode(&self, frame: &CameraFrame) -> Result<Option<Decoded>, DecodeError> {
        let start = std::time::Instant::now();
        if frame.width == 0 || frame.height == 0 {
            return Ok(None);
        }

        let luma = LumaPlane::extract(frame)?;
        let luma = if frame.width > self.max_dimension || frame.height > self.max_dimension {
            let scale = (frame.width as f32 / self.max_dimension as f32)
                .max(frame.height as f32 / self.max_dimension as f32);
            let new_width = ((frame.width as f32 / scale) as u32).max(1);
            let new_height = ((frame.height as f32 / scale) as u32).max(1);
            luma.downscale(new_width, new_height)
        } else {
            luma
        };

        trace!(
            width = luma.width,
            height = luma.height,
            conversion_ms = start.elapsed().as_millis(),
            "Prepared luma plane for QR detection"
        );

        let (width, height) = (luma.width as usize, luma.height as usize);
        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(width, height, |x, y| {
                luma.pixels[y * width + x]
            });
        let grids = prepared.detect_grids();

        for grid in grids {
            match grid.decode() {
                Ok((_meta, content)) => {
                    debug!(
                        content = %content,
                        total_ms = start.elapsed().as_millis(),
                        "Detected QR code"
                    );
                    return Ok(Some(Decoded::qr(content)));
                }
                Err(e) => {
                    debug!(error = ?e, "Failed to decode QR grid");
                }
            }
        }

        Ok(None)
    }
}

/// Tightly packed 8-bit luma plane
#[derive(Debug)]
struct LumaPlane {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl LumaPlane {
    /// Copy the luma of a frame without stride padding
    fn extract(frame: &CameraFrame) -> Result<Self, DecodeError> {
        let width = frame.width as usize;
        let height = frame.height as usize;
        let stride = frame.stride as usize;
        let bpp = frame.format.primary_plane_bpp() as usize;
        let row_bytes = width.saturating_mul(bpp);

        if stride < row_bytes {
            return Err(DecodeError::Truncated {
                expected: row_bytes,
                actual: stride,
            });
        }
        let expected = if height == 0 {
            0
        } else {
            stride
                .checked_mul(height - 1)
                .and_then(|n| n.checked_add(row_bytes))
                .unwrap_or(usize::MAX)
        };
        if frame.data.len() < expected {
            return Err(DecodeError::Truncated {
                expected,
                actual: frame.data.len(),
            });
        }

        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            let row = &frame.data[y * stride..y * stride + row_bytes];
            match frame.format {
                // Semi-planar formats keep luma in the first plane
                PixelFormat::Gray8 | PixelFormat::NV12 | PixelFormat::NV21 => {
                    pixels.extend_from_slice(row)
                }
                PixelFormat::RGBA => pixels.extend(row.chunks_exact(4).map(|px| {
                    ((px[0] as u32 * 299 + px[1] as u32 * 587 + px[2] as u32 * 114) / 1000) as u8
                })),
            }
        }

        Ok(Self {
            width: frame.width,
            height: frame.height,
            pixels,
        })
    }

    /// Downscale using bilinear interpolation
    fn downscale(&self, dst_width: u32, dst_height: u32) -> Self {
        let src_width = self.width as usize;
        let src_height = self.height as usize;

        let mut pixels = Vec::with_capacity((dst_width * dst_height) as usize);

        let x_ratio = src_width as f32 / dst_width as f32;
        let y_ratio = src_height as f32 / dst_height as f32;

        let get = |px: usize, py: usize| -> f32 {
            self.pixels.get(py * src_width + px).copied().unwrap_or(0) as f32
        };

        for y in 0..dst_height {
            for x in 0..dst_width {
                let src_x = x as f32 * x_ratio;
                let src_y = y as f32 * y_ratio;

                let x0 = src_x as usize;
                let y0 = src_y as usize;
                let x1 = (x0 + 1).min(src_width - 1);
                let y1 = (y0 + 1).min(src_height - 1);

                let x_frac = src_x - x0 as f32;
                let y_frac = src_y - y0 as f32;

                let value = get(x0, y0) * (1.0 - x_frac) * (1.0 - y_frac)
                    + get(x1, y0) * x_frac * (1.0 - y_frac)
                    + get(x0, y1) * (1.0 - x_frac) * y_frac
                    + get(x1, y1) * x_frac * y_frac;

                pixels.push(value as u8);
            }
        }

        Self {
            width: dst_width,
            height: dst_height,
            pixels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_extract_luma_without_stride() {
        // 2x2 RGBA frame with two bytes of stride padding per row
        let data: Vec<u8> = vec![
            255, 0, 0, 255, // Red pixel
            0, 255, 0, 255, // Green pixel
            0, 0,           // stride padding
            0, 0, 255, 255, // Blue pixel
            255, 255, 255, 255, // White pixel
            0, 0,           // stride padding
        ];

        let frame = CameraFrame::new(2, 2, PixelFormat::RGBA, Arc::from(data.as_slice()))
            .with_stride(10);

        let luma = LumaPlane::extract(&frame).unwrap();
        assert_eq!(luma.pixels.len(), 4);
        assert_eq!(luma.pixels, vec![76, 149, 29, 255]);
    }

    #[test]
    fn test_extract_nv12_uses_y_plane() {
        // 2x2 Y plane followed by one UV pair
        let data: Vec<u8> = vec![10, 20, 30, 40, 128, 128];
        let frame = CameraFrame::new(2, 2, PixelFormat::NV12, Arc::from(data.as_slice()));

        let luma = LumaPlane::extract(&frame).unwrap();
        assert_eq!(luma.pixels, vec![10, 20, 30, 40]);
    }

    #[test]
    fn test_truncated_frame_is_rejected() {
        let frame = CameraFrame::new(4, 4, PixelFormat::RGBA, Arc::from(vec![0u8; 20]));
        let err = QrDetector::new().decode(&frame).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Truncated {
                expected: 64,
                actual: 20
            }
        ));
    }

    #[test]
    fn test_oversized_width_is_rejected_without_overflow() {
        let frame = CameraFrame::new(1 << 30, 1, PixelFormat::RGBA, Arc::from(vec![0u8; 16]));
        assert!(matches!(
            QrDetector::new().decode(&frame),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn test_decodes_qr_fixture() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/qr_device_bridge.png");
        let rgba = image::open(path).unwrap().to_rgba8();
        let (width, height) = rgba.dimensions();
        let frame = CameraFrame::new(width, height, PixelFormat::RGBA, Arc::from(rgba.into_raw()));

        assert_eq!(
            QrDetector::new().decode(&frame).unwrap(),
            Some(Decoded::qr("device-bridge:ok"))
        );
    }

    #[test]
    fn test_downscale_luma() {
        // 4x2 gradient
        let plane = LumaPlane {
            width: 4,
            height: 2,
            pixels: vec![0, 85, 170, 255, 0, 85, 170, 255],
        };

        let small = plane.downscale(2, 1);
        assert_eq!(small.pixels.len(), 2);
        assert!(small.pixels[0] < 100);
        assert!(small.pixels[1] > 150);
    }

    #[test]
    fn test_blank_frame_has_no_code() {
        let frame = CameraFrame::new(64, 64, PixelFormat::Gray8, Arc::from(vec![255u8; 64 * 64]));
        assert_eq!(QrDetector::new().decode(&frame).unwrap(), None);
    }
}
