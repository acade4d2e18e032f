// SPDX-License-Identifier: GPL-3.0-only

//! Capture session lifecycle
//!
//! [`CaptureSessionManager`] owns the camera for the duration of a session
//! and wires it to the surface broker, the frame queue and the decode
//! worker. Every lifecycle operation runs under one async lock, so callers
//! never observe interleaved Starting/Stopping windows: a `start` issued
//! while a `stop` is in progress simply waits for it to reach Idle.

use crate::backends::camera::{
    CameraBinding, CameraHandle, CameraProvider, FrameSink, SurfaceRequester,
};
use crate::config::Config;
use crate::errors::{BridgeError, BridgeResult, CameraError, SurfaceBindError};
use crate::frame_processor::{
    DecodeDispatcher, DecodeWorker, EventGate, FrameBackpressureQueue, FrameDecoder,
    ScanEventSender,
};
use crate::surface::{SurfaceBinding, TextureSurfaceBroker};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

/// Lifecycle state of the capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Idle,
    Starting,
    Active,
    Stopping,
}

/// Texture handed to the caller for rendering the preview
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraTexture {
    pub texture_id: u64,
    pub width: u32,
    pub height: u32,
}

impl From<SurfaceBinding> for CameraTexture {
    fn from(binding: SurfaceBinding) -> Self {
        Self {
            texture_id: binding.handle.0,
            width: binding.width,
            height: binding.height,
        }
    }
}

/// Timing and sizing knobs for sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub texture_width: u32,
    pub texture_height: u32,
    pub acquire_timeout: Duration,
    pub shutdown_grace: Duration,
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        Self {
            texture_width: config.texture_width,
            texture_height: config.texture_height,
            acquire_timeout: config.camera_acquire_timeout(),
            shutdown_grace: config.shutdown_grace(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// One active capture session. Nothing in here outlives it.
struct Session {
    generation: u64,
    camera: Box<dyn CameraHandle>,
    queue: Arc<FrameBackpressureQueue>,
    worker: DecodeWorker,
    bound: bool,
}

impl Session {
    fn bind(
        &mut self,
        preview: SurfaceBinding,
        broker: &Arc<TextureSurfaceBroker>,
    ) -> Result<(), CameraError> {
        self.unbind();
        self.camera.bind(CameraBinding {
            preview,
            frames: FrameSink::new(Arc::clone(&self.queue)),
            surfaces: SurfaceRequester::new(Arc::clone(broker)),
        })?;
        self.bound = true;
        debug!(generation = self.generation, preview = %preview.handle, "Camera bound");
        Ok(())
    }

    fn unbind(&mut self) {
        if self.bound {
            self.camera.unbind();
            self.bound = false;
            debug!(generation = self.generation, "Camera unbound");
        }
    }
}

/// Resets the published state if a transition is abandoned midway
struct StateGuard<'a> {
    state: &'a watch::Sender<SessionState>,
    on_abort: SessionState,
    armed: bool,
}

impl<'a> StateGuard<'a> {
    fn new(state: &'a watch::Sender<SessionState>, on_abort: SessionState) -> Self {
        Self {
            state,
            on_abort,
            armed: true,
        }
    }

    fn complete(mut self, state: SessionState) {
        self.armed = false;
        self.state.send_replace(state);
    }
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.send_replace(self.on_abort);
        }
    }
}

struct Lifecycle {
    session: Option<Session>,
    generations: u64,
}

/// Owner of camera acquisition and the per-session frame pipeline
pub struct CaptureSessionManager {
    provider: Arc<dyn CameraProvider>,
    decoder: Arc<dyn FrameDecoder>,
    broker: Arc<TextureSurfaceBroker>,
    events: ScanEventSender,
    settings: SessionSettings,
    lifecycle: Mutex<Lifecycle>,
    state: watch::Sender<SessionState>,
}

impl CaptureSessionManager {
    pub fn new(
        provider: Arc<dyn CameraProvider>,
        decoder: Arc<dyn FrameDecoder>,
        broker: Arc<TextureSurfaceBroker>,
        events: ScanEventSender,
        settings: SessionSettings,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            provider,
            decoder,
            broker,
            events,
            settings,
            lifecycle: Mutex::new(Lifecycle {
                session: None,
                generations: 0,
            }),
            state,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Follow lifecycle state changes
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn broker(&self) -> &Arc<TextureSurfaceBroker> {
        &self.broker
    }

    /// Whether the active session's camera is bound to a surface
    pub async fn is_camera_bound(&self) -> bool {
        let lifecycle = self.lifecycle.lock().await;
        lifecycle.session.as_ref().is_some_and(|s| s.bound)
    }

    /// Start a session. No-op if one is already active.
    ///
    /// On failure the manager is back to Idle and `start` may be retried.
    pub async fn start(&self) -> BridgeResult<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        if let Some(session) = lifecycle.session.as_ref() {
            debug!(generation = session.generation, "Capture session already active");
            return Ok(());
        }

        lifecycle.generations += 1;
        let generation = lifecycle.generations;
        info!(generation, "Starting capture session");

        self.state.send_replace(SessionState::Starting);
        let guard = StateGuard::new(&self.state, SessionState::Idle);

        let acquired = tokio::time::timeout(self.settings.acquire_timeout, self.provider.acquire())
            .await
            .unwrap_or(Err(CameraError::AcquisitionTimedOut(
                self.settings.acquire_timeout,
            )));
        let camera = match acquired {
            Ok(camera) => camera,
            Err(e) => {
                warn!(generation, error = %e, "Camera acquisition failed");
                return Err(BridgeError::ResourceAcquisition(e));
            }
        };

        let queue = Arc::new(FrameBackpressureQueue::new());
        let dispatcher = DecodeDispatcher::new(
            Arc::clone(&self.decoder),
            Arc::new(EventGate::new(self.events.clone())),
        );
        let worker = DecodeWorker::spawn(
            &format!("decode-worker-{}", generation),
            Arc::clone(&queue),
            dispatcher,
        )
        .map_err(|e| {
            warn!(generation, error = %e, "Failed to spawn decode worker");
            BridgeError::ResourceAcquisition(CameraError::Unavailable(format!(
                "failed to spawn decode worker: {}",
                e
            )))
        })?;

        let mut session = Session {
            generation,
            camera,
            queue,
            worker,
            bound: false,
        };

        // A texture requested before start gets the camera right away
        if let Some(preview) = self.broker.current()
            && let Err(e) = session.bind(preview, &self.broker)
        {
            warn!(generation, error = %e, "Binding to existing surface failed");
        }

        lifecycle.session = Some(session);
        guard.complete(SessionState::Active);
        info!(generation, "Capture session active");
        Ok(())
    }

    /// Stop the session and release everything it owns. Idempotent.
    ///
    /// The decode worker gets `shutdown_grace` to exit; past that it is
    /// detached, and its result (if any) is discarded.
    pub async fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        let Some(mut session) = lifecycle.session.take() else {
            self.broker.release();
            debug!("Capture session already stopped");
            return;
        };

        let generation = session.generation;
        info!(generation, "Stopping capture session");
        let guard = StateGuard::new(&self.state, SessionState::Idle);

        session.unbind();
        session.worker.signal_stop();
        self.broker.release();
        self.state.send_replace(SessionState::Stopping);

        let Session { camera, worker, .. } = session;
        let clean = worker.shutdown(self.settings.shutdown_grace).await;
        drop(camera);

        guard.complete(SessionState::Idle);
        info!(generation, clean, "Capture session stopped");
    }

    /// Create (or replace) the preview texture and bind the camera to it
    /// when a session is active
    pub async fn get_camera_texture(&self) -> BridgeResult<CameraTexture> {
        let mut lifecycle = self.lifecycle.lock().await;
        let binding = self
            .broker
            .acquire(self.settings.texture_width, self.settings.texture_height)?;

        if let Some(session) = lifecycle.session.as_mut()
            && let Err(e) = session.bind(binding, &self.broker)
        {
            warn!(generation = session.generation, error = %e, "Camera rejected surface");
            self.broker.release();
            return Err(SurfaceBindError::Camera(e).into());
        }

        // The camera may have renegotiated the size while binding
        let texture = self.broker.current().unwrap_or(binding);
        Ok(texture.into())
    }

    /// Unbind the camera from the preview texture and release it. Idempotent.
    pub async fn dispose_camera_texture(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        if let Some(session) = lifecycle.session.as_mut() {
            session.unbind();
        }
        self.broker.release();
    }
}

impl std::fmt::Debug for CaptureSessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSessionManager")
            .field("state", &self.state())
            .field("settings", &self.settings)
            .finish()
    }
}
