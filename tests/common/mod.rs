// SPDX-License-Identifier: GPL-3.0-only

//! Shared fakes for integration tests

#![allow(dead_code)]

use device_bridge::backends::biometric::{BiometricAvailability, BiometricSensor};
use device_bridge::backends::camera::{
    CameraBinding, CameraFrame, CameraHandle, CameraProvider, FrameSink, PixelFormat,
};
use device_bridge::backends::texture::InProcessTextures;
use device_bridge::biometric::{AuthCallback, AuthRequest, AuthResult};
use device_bridge::errors::{CameraError, DecodeError};
use device_bridge::frame_processor::{Decoded, FrameDecoder};
use device_bridge::storage::{CredentialStore, MemoryCredentialStore};
use device_bridge::{Collaborators, Config, DeviceBridge, ScanEvents, SessionState};
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// Gray8 frame whose bytes are `text`, one row high
pub fn text_frame(text: &str) -> CameraFrame {
    CameraFrame::new(
        text.len() as u32,
        1,
        PixelFormat::Gray8,
        Arc::from(text.as_bytes()),
    )
}

/// Poll `condition` until it holds or `limit` passes
pub async fn wait_until(limit: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

// ===== Camera =====

#[derive(Default)]
pub struct FakeCameraState {
    failures_left: Mutex<usize>,
    hang: AtomicBool,
    reject_bind: AtomicBool,
    renegotiate_to: Mutex<Option<(u32, u32)>>,
    sink: Mutex<Option<FrameSink>>,
    session_state: Mutex<Option<watch::Receiver<SessionState>>>,
    acquire_log: Mutex<Vec<AcquireRecord>>,
    pub acquisitions: AtomicUsize,
    pub binds: AtomicUsize,
    pub unbinds: AtomicUsize,
    /// Handles dropped so far
    pub released: AtomicUsize,
}

/// What the camera saw when it was asked to open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquireRecord {
    pub session_state: Option<SessionState>,
    pub handles_released: usize,
}

impl FakeCameraState {
    /// Push into the bound session. False when the camera is not bound.
    pub fn push(&self, frame: CameraFrame) -> bool {
        match self.sink.lock().unwrap().as_ref() {
            Some(sink) => {
                sink.push(frame);
                true
            }
            None => false,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.sink.lock().unwrap().is_some()
    }

    pub fn fail_next(&self, count: usize) {
        *self.failures_left.lock().unwrap() = count;
    }

    pub fn set_hang(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }

    pub fn set_reject_bind(&self, reject: bool) {
        self.reject_bind.store(reject, Ordering::SeqCst);
    }

    /// Sample this session state on every acquisition
    pub fn observe_session(&self, state: watch::Receiver<SessionState>) {
        *self.session_state.lock().unwrap() = Some(state);
    }

    pub fn acquire_log(&self) -> Vec<AcquireRecord> {
        self.acquire_log.lock().unwrap().clone()
    }

    /// Ask for this preview size on every bind
    pub fn renegotiate_on_bind(&self, width: u32, height: u32) {
        *self.renegotiate_to.lock().unwrap() = Some((width, height));
    }
}

#[derive(Clone, Default)]
pub struct FakeCamera {
    pub state: Arc<FakeCameraState>,
}

impl FakeCamera {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CameraProvider for FakeCamera {
    fn acquire(&self) -> BoxFuture<'static, Result<Box<dyn CameraHandle>, CameraError>> {
        let state = Arc::clone(&self.state);
        Box::pin(async move {
            state.acquisitions.fetch_add(1, Ordering::SeqCst);
            let record = AcquireRecord {
                session_state: state
                    .session_state
                    .lock()
                    .unwrap()
                    .as_ref()
                    .map(|rx| *rx.borrow()),
                handles_released: state.released.load(Ordering::SeqCst),
            };
            state.acquire_log.lock().unwrap().push(record);
            if state.hang.load(Ordering::SeqCst) {
                futures::future::pending::<()>().await;
            }
            {
                let mut failures = state.failures_left.lock().unwrap();
                if *failures > 0 {
                    *failures -= 1;
                    return Err(CameraError::Unavailable("camera in use".into()));
                }
            }
            Ok(Box::new(FakeHandle { state }) as Box<dyn CameraHandle>)
        })
    }
}

struct FakeHandle {
    state: Arc<FakeCameraState>,
}

impl CameraHandle for FakeHandle {
    fn bind(&mut self, binding: CameraBinding) -> Result<(), CameraError> {
        if self.state.reject_bind.load(Ordering::SeqCst) {
            return Err(CameraError::BindFailed("surface format rejected".into()));
        }
        let renegotiate = *self.state.renegotiate_to.lock().unwrap();
        if let Some((width, height)) = renegotiate {
            binding
                .surfaces
                .request_size(width, height)
                .map_err(|e| CameraError::BindFailed(e.to_string()))?;
        }
        *self.state.sink.lock().unwrap() = Some(binding.frames);
        self.state.binds.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn unbind(&mut self) {
        if self.state.sink.lock().unwrap().take().is_some() {
            self.state.unbinds.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        self.state.released.fetch_add(1, Ordering::SeqCst);
    }
}

// ===== Decoder =====

/// Reads Gray8 frame bytes back as the code content
///
/// Can be held, which parks the decode worker inside `decode` until
/// released.
#[derive(Default)]
pub struct TextDecoder {
    seen: Mutex<Vec<String>>,
    held: Mutex<bool>,
    released: Condvar,
    entered: AtomicUsize,
}

impl TextDecoder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    /// Decodes started so far
    pub fn entered(&self) -> usize {
        self.entered.load(Ordering::SeqCst)
    }

    pub fn hold(&self) {
        *self.held.lock().unwrap() = true;
    }

    pub fn release(&self) {
        *self.held.lock().unwrap() = false;
        self.released.notify_all();
    }
}

impl FrameDecoder for TextDecoder {
    fn decode(&self, frame: &CameraFrame) -> Result<Option<Decoded>, DecodeError> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        let mut held = self.held.lock().unwrap();
        while *held {
            held = self.released.wait(held).unwrap();
        }
        drop(held);

        let text = String::from_utf8_lossy(&frame.data).into_owned();
        self.seen.lock().unwrap().push(text.clone());
        Ok(Some(Decoded::qr(text)))
    }
}

// ===== Biometric sensor =====

#[derive(Debug, Clone)]
pub enum SensorScript {
    /// Never calls back
    Never,
    /// Calls back before `prompt` returns
    Immediate(AuthResult),
    /// Calls back after a delay
    After(Duration, AuthResult),
    /// Calls back twice in a row
    Twice(AuthResult, AuthResult),
}

pub struct ScriptedSensor {
    script: SensorScript,
    availability: BiometricAvailability,
    pub requests: Mutex<Vec<AuthRequest>>,
    pub callbacks: Mutex<Vec<AuthCallback>>,
    /// Return value of every `resolve` made by the sensor, in order
    pub deliveries: Arc<Mutex<Vec<bool>>>,
}

impl ScriptedSensor {
    pub fn new(script: SensorScript) -> Arc<Self> {
        Self::with_availability(script, BiometricAvailability::Available)
    }

    pub fn with_availability(
        script: SensorScript,
        availability: BiometricAvailability,
    ) -> Arc<Self> {
        Arc::new(Self {
            script,
            availability,
            requests: Mutex::new(Vec::new()),
            callbacks: Mutex::new(Vec::new()),
            deliveries: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn deliveries(&self) -> Vec<bool> {
        self.deliveries.lock().unwrap().clone()
    }

    pub fn last_callback(&self) -> Option<AuthCallback> {
        self.callbacks.lock().unwrap().last().cloned()
    }
}

impl BiometricSensor for ScriptedSensor {
    fn availability(&self) -> BiometricAvailability {
        self.availability
    }

    fn prompt(&self, request: AuthRequest, callback: AuthCallback) {
        self.requests.lock().unwrap().push(request);
        self.callbacks.lock().unwrap().push(callback.clone());

        match self.script.clone() {
            SensorScript::Never => {}
            SensorScript::Immediate(result) => {
                let delivered = callback.resolve(result);
                self.deliveries.lock().unwrap().push(delivered);
            }
            SensorScript::After(delay, result) => {
                let deliveries = Arc::clone(&self.deliveries);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let delivered = callback.resolve(result);
                    deliveries.lock().unwrap().push(delivered);
                });
            }
            SensorScript::Twice(first, second) => {
                let a = callback.resolve(first);
                let b = callback.resolve(second);
                self.deliveries.lock().unwrap().extend([a, b]);
            }
        }
    }
}

// ===== Bridge =====

pub struct Harness {
    pub bridge: DeviceBridge,
    pub events: ScanEvents,
    pub camera: Arc<FakeCameraState>,
    pub decoder: Arc<TextDecoder>,
    pub textures: Arc<InProcessTextures>,
    pub credentials: Arc<MemoryCredentialStore>,
}

pub fn harness(config: &Config) -> Harness {
    harness_with_sensor(config, ScriptedSensor::new(SensorScript::Never))
}

pub fn harness_with_sensor(config: &Config, sensor: Arc<dyn BiometricSensor>) -> Harness {
    let camera = FakeCamera::new();
    let decoder = TextDecoder::new();
    let textures = Arc::new(InProcessTextures::new());
    let credentials = Arc::new(MemoryCredentialStore::new());

    let (bridge, events) = DeviceBridge::new(
        config,
        Collaborators {
            camera: Arc::new(camera.clone()),
            surfaces: textures.clone(),
            sensor,
            credentials: credentials.clone() as Arc<dyn CredentialStore>,
            decoder: Some(decoder.clone()),
        },
    );

    Harness {
        bridge,
        events,
        camera: camera.state,
        decoder,
        textures,
        credentials,
    }
}

/// Config with short timings for lifecycle tests
pub fn fast_config() -> Config {
    Config {
        shutdown_grace_ms: 200,
        camera_acquire_timeout_ms: 200,
        ..Config::default()
    }
}
