// SPDX-License-Identifier: GPL-3.0-only

//! Still-image camera
//!
//! Presents an image file as a camera: acquisition decodes the file, and
//! while bound the same frame is pushed into the analysis sink at a fixed
//! interval. On bind the camera asks for a preview surface matching the
//! image dimensions.

use super::frame_loop::{LoopAction, LoopController};
use super::{CameraBinding, CameraFrame, CameraHandle, CameraProvider, PixelFormat};
use crate::constants::file_formats;
use crate::errors::CameraError;
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Camera provider backed by an image file
#[derive(Debug, Clone)]
pub struct StillImageCamera {
    path: PathBuf,
    frame_interval: Duration,
}

impl StillImageCamera {
    pub fn new(path: impl Into<PathBuf>, frame_interval: Duration) -> Self {
        Self {
            path: path.into(),
            frame_interval,
        }
    }
}

impl CameraProvider for StillImageCamera {
    fn acquire(&self) -> BoxFuture<'static, Result<Box<dyn CameraHandle>, CameraError>> {
        let path = self.path.clone();
        let frame_interval = self.frame_interval;
        Box::pin(async move {
            let loaded = tokio::task::spawn_blocking(move || load_rgba(&path))
                .await
                .map_err(|e| CameraError::Unavailable(format!("image loader failed: {}", e)))??;

            let (width, height, data) = loaded;
            info!(width, height, "Still-image camera acquired");
            Ok(Box::new(StillImageHandle {
                width,
                height,
                data,
                frame_interval,
                feeder: None,
            }) as Box<dyn CameraHandle>)
        })
    }
}

/// Decode an image file into tightly packed RGBA
fn load_rgba(path: &Path) -> Result<(u32, u32, Arc<[u8]>), CameraError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if !file_formats::is_image_extension(&extension) {
        return Err(CameraError::Unavailable(format!(
            "unsupported file format: {}",
            extension
        )));
    }

    let image = image::open(path)
        .map_err(|e| CameraError::Unavailable(format!("{}: {}", path.display(), e)))?;
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok((width, height, Arc::from(rgba.into_raw())))
}

struct StillImageHandle {
    width: u32,
    height: u32,
    data: Arc<[u8]>,
    frame_interval: Duration,
    feeder: Option<LoopController>,
}

impl CameraHandle for StillImageHandle {
    fn bind(&mut self, binding: CameraBinding) -> Result<(), CameraError> {
        self.unbind();

        if let Err(e) = binding.surfaces.request_size(self.width, self.height) {
            warn!(error = %e, "Preview surface renegotiation failed");
        }

        let (width, height) = (self.width, self.height);
        let data = Arc::clone(&self.data);
        let interval = self.frame_interval;
        let sink = binding.frames;

        let feeder = LoopController::start("still-image-feed", move || {
            if sink.is_closed() {
                return LoopAction::Stop;
            }
            sink.push(CameraFrame::new(
                width,
                height,
                PixelFormat::RGBA,
                Arc::clone(&data),
            ));
            std::thread::sleep(interval);
            LoopAction::Continue
        })
        .map_err(|e| CameraError::BindFailed(format!("failed to spawn feeder: {}", e)))?;

        debug!(preview = %binding.preview.handle, "Still-image camera bound");
        self.feeder = Some(feeder);
        Ok(())
    }

    /// Called from async code, so the feeder is signalled and detached
    /// rather than joined. It exits after its current sleep.
    fn unbind(&mut self) {
        if let Some(feeder) = self.feeder.take() {
            feeder.request_stop();
            drop(feeder);
            debug!("Still-image camera unbound");
        }
    }
}

impl Drop for StillImageHandle {
    fn drop(&mut self) {
        self.unbind();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::{FrameSink, SurfaceRequester};
    use crate::backends::texture::InProcessTextures;
    use crate::frame_processor::FrameBackpressureQueue;
    use crate::surface::TextureSurfaceBroker;
    use std::time::Instant;

    fn write_white(path: &Path, width: u32, height: u32) {
        image::RgbaImage::from_pixel(width, height, image::Rgba([255, 255, 255, 255]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_rejects_unknown_extension() {
        let err = load_rgba(Path::new("/tmp/not-an-image.txt")).unwrap_err();
        assert!(matches!(err, CameraError::Unavailable(msg) if msg.contains("txt")));
    }

    #[tokio::test]
    async fn test_acquire_missing_file_fails() {
        let camera = StillImageCamera::new("/nonexistent/code.png", Duration::from_millis(10));
        assert!(matches!(
            camera.acquire().await,
            Err(CameraError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_acquire_decodes_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("white.png");
        write_white(&path, 8, 4);

        let camera = StillImageCamera::new(&path, Duration::from_millis(10));
        assert!(camera.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn test_unbind_does_not_wait_for_the_feeder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("white.png");
        write_white(&path, 8, 4);

        let mut handle = StillImageCamera::new(&path, Duration::from_millis(500))
            .acquire()
            .await
            .unwrap();
        let broker = Arc::new(TextureSurfaceBroker::new(Arc::new(InProcessTextures::new())));
        let queue = Arc::new(FrameBackpressureQueue::new());
        handle
            .bind(CameraBinding {
                preview: broker.acquire(8, 4).unwrap(),
                frames: FrameSink::new(Arc::clone(&queue)),
                surfaces: SurfaceRequester::new(Arc::clone(&broker)),
            })
            .unwrap();

        // First frame pushed, so the feeder is now inside its 500 ms sleep
        let deadline = Instant::now() + Duration::from_secs(2);
        while queue.pushed_count() == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(queue.pushed_count(), 1);

        let started = Instant::now();
        handle.unbind();
        assert!(
            started.elapsed() < Duration::from_millis(100),
            "unbind blocked for {:?}",
            started.elapsed()
        );
        drop(handle);
        assert!(started.elapsed() < Duration::from_millis(100));
    }
}
