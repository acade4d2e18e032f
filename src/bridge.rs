// SPDX-License-Identifier: GPL-3.0-only

//! Caller-facing facade
//!
//! [`DeviceBridge`] is the one object the calling layer talks to. It is
//! constructed explicitly from a [`Config`] and the platform collaborators,
//! and owns the capture session manager, the biometric bridge and the PIN
//! vault. Scan results arrive on the [`ScanEvents`] receiver returned by
//! [`DeviceBridge::new`].

use crate::backends::biometric::{BiometricAvailability, BiometricSensor};
use crate::backends::camera::CameraProvider;
use crate::biometric::{AuthResult, BiometricResultBridge, PinVault};
use crate::config::Config;
use crate::errors::{BridgeResult, CredentialError};
use crate::frame_processor::{FrameDecoder, QrDetector, ScanEvents};
use crate::session::{CameraTexture, CaptureSessionManager, SessionSettings, SessionState};
use crate::storage::CredentialStore;
use crate::surface::{SurfaceFactory, TextureSurfaceBroker};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

/// Platform pieces the bridge is built from
pub struct Collaborators {
    pub camera: Arc<dyn CameraProvider>,
    pub surfaces: Arc<dyn SurfaceFactory>,
    pub sensor: Arc<dyn BiometricSensor>,
    pub credentials: Arc<dyn CredentialStore>,
    /// Defaults to a [`QrDetector`] sized from the config
    pub decoder: Option<Arc<dyn FrameDecoder>>,
}

pub struct DeviceBridge {
    sessions: CaptureSessionManager,
    biometrics: BiometricResultBridge,
    pins: PinVault,
    auth_timeout: Duration,
}

impl DeviceBridge {
    pub fn new(config: &Config, collaborators: Collaborators) -> (Self, ScanEvents) {
        let Collaborators {
            camera,
            surfaces,
            sensor,
            credentials,
            decoder,
        } = collaborators;

        let decoder = decoder.unwrap_or_else(|| {
            Arc::new(QrDetector::with_max_dimension(config.qr_max_dimension))
        });
        let broker = Arc::new(TextureSurfaceBroker::new(surfaces));
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let bridge = Self {
            sessions: CaptureSessionManager::new(
                camera,
                decoder,
                broker,
                events_tx,
                SessionSettings::from(config),
            ),
            biometrics: BiometricResultBridge::new(sensor, config.prompt.clone()),
            pins: PinVault::new(credentials),
            auth_timeout: config.auth_timeout(),
        };
        info!(
            texture_width = config.texture_width,
            texture_height = config.texture_height,
            auth_timeout_ms = config.auth_timeout_ms,
            "Device bridge ready"
        );
        (bridge, events_rx)
    }

    pub async fn start_scanner(&self) -> BridgeResult<()> {
        self.sessions.start().await
    }

    pub async fn stop_scanner(&self) {
        self.sessions.stop().await;
    }

    pub fn scanner_state(&self) -> SessionState {
        self.sessions.state()
    }

    pub async fn get_camera_texture(&self) -> BridgeResult<CameraTexture> {
        self.sessions.get_camera_texture().await
    }

    pub async fn dispose_camera_texture(&self) {
        self.sessions.dispose_camera_texture().await;
    }

    pub fn sessions(&self) -> &CaptureSessionManager {
        &self.sessions
    }

    /// Prompt for biometrics, waiting at most the configured timeout
    pub async fn authenticate_with_biometrics(&self) -> AuthResult {
        self.biometrics.authenticate(self.auth_timeout).await
    }

    pub fn is_biometric_available(&self) -> bool {
        self.biometrics.is_biometric_available()
    }

    pub fn biometric_availability(&self) -> BiometricAvailability {
        self.biometrics.availability()
    }

    pub async fn save_encrypted_pin(&self, pin: &str) -> BridgeResult<()> {
        let pins = self.pins.clone();
        let pin = pin.to_string();
        tokio::task::spawn_blocking(move || pins.save_encrypted_pin(&pin))
            .await
            .map_err(CredentialError::from)??;
        Ok(())
    }

    pub async fn verify_pin(&self, pin: &str) -> BridgeResult<bool> {
        let pins = self.pins.clone();
        let pin = pin.to_string();
        let matches = tokio::task::spawn_blocking(move || pins.verify_pin(&pin))
            .await
            .map_err(CredentialError::from)??;
        Ok(matches)
    }
}

impl std::fmt::Debug for DeviceBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceBridge")
            .field("sessions", &self.sessions)
            .field("biometrics", &self.biometrics)
            .field("auth_timeout", &self.auth_timeout)
            .finish()
    }
}
