// SPDX-License-Identifier: GPL-3.0-only

//! Biometric authentication bridge
//!
//! The sensor answers through a callback whenever it likes, possibly more
//! than once, possibly never. [`BiometricResultBridge::authenticate`] turns
//! that into a call that always returns exactly one [`AuthResult`] within
//! the timeout:
//!
//! - the result travels over a single-shot channel;
//! - whoever flips the slot's `claimed` flag first (the callback, or the
//!   waiter on timeout) decides the result, and everyone after is a no-op.

pub mod pin;

pub use pin::PinVault;

use crate::backends::biometric::{BiometricAvailability, BiometricSensor};
use crate::config::PromptSettings;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Why an authentication did not succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthErrorCode {
    None,
    Timeout,
    SensorError,
    UserCancelled,
}

/// Outcome of one `authenticate` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResult {
    pub success: bool,
    pub error_code: AuthErrorCode,
    pub error_message: Option<String>,
}

impl AuthResult {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            error_code: AuthErrorCode::None,
            error_message: None,
        }
    }

    pub fn timeout() -> Self {
        Self {
            success: false,
            error_code: AuthErrorCode::Timeout,
            error_message: Some("The operation timed out".to_string()),
        }
    }

    pub fn sensor_error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_code: AuthErrorCode::SensorError,
            error_message: Some(message.into()),
        }
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_code: AuthErrorCode::UserCancelled,
            error_message: Some(message.into()),
        }
    }
}

/// One prompt, as handed to the sensor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequest {
    /// Correlates the callback with the call that issued the prompt
    pub id: Uuid,
    pub title: String,
    pub subtitle: String,
    pub negative_button: String,
}

impl AuthRequest {
    fn new(prompt: &PromptSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: prompt.title.clone(),
            subtitle: prompt.subtitle.clone(),
            negative_button: prompt.negative_button.clone(),
        }
    }
}

/// Where an authentication stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthPhase {
    #[default]
    Idle,
    /// Prompt shown, waiting for the callback or the timeout
    Prompted,
    /// A result has been handed to the caller
    Resolved,
}

struct ResultSlot {
    request_id: Uuid,
    claimed: AtomicBool,
    sender: Mutex<Option<oneshot::Sender<AuthResult>>>,
}

impl ResultSlot {
    fn new(request_id: Uuid, sender: oneshot::Sender<AuthResult>) -> Self {
        Self {
            request_id,
            claimed: AtomicBool::new(false),
            sender: Mutex::new(Some(sender)),
        }
    }

    /// First caller wins
    fn claim(&self) -> bool {
        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn deliver(&self, result: AuthResult) -> bool {
        if !self.claim() {
            debug!(request_id = %self.request_id, "Ignoring callback for resolved prompt");
            return false;
        }
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match sender {
            Some(tx) => tx.send(result).is_ok(),
            None => false,
        }
    }
}

/// Handle the sensor uses to report the outcome of a prompt
///
/// Cheap to clone. Only the first report across all clones (and the
/// bridge's own timeout) takes effect; the return value says whether this
/// one did.
#[derive(Clone)]
pub struct AuthCallback {
    slot: Arc<ResultSlot>,
}

impl AuthCallback {
    pub fn request_id(&self) -> Uuid {
        self.slot.request_id
    }

    pub fn resolve(&self, result: AuthResult) -> bool {
        self.slot.deliver(result)
    }

    pub fn succeeded(&self) -> bool {
        self.resolve(AuthResult::succeeded())
    }

    pub fn error(&self, message: impl Into<String>) -> bool {
        self.resolve(AuthResult::sensor_error(message))
    }

    /// The user dismissed the prompt or chose the PIN fallback
    pub fn cancelled(&self, message: impl Into<String>) -> bool {
        self.resolve(AuthResult::cancelled(message))
    }
}

impl std::fmt::Debug for AuthCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthCallback")
            .field("request_id", &self.slot.request_id)
            .field("claimed", &self.slot.claimed.load(Ordering::Acquire))
            .finish()
    }
}

/// Turns the sensor's callback into a bounded wait
pub struct BiometricResultBridge {
    sensor: Arc<dyn BiometricSensor>,
    prompt: PromptSettings,
    // One prompt on screen at a time
    serial: tokio::sync::Mutex<()>,
    phase: Mutex<AuthPhase>,
}

impl BiometricResultBridge {
    pub fn new(sensor: Arc<dyn BiometricSensor>, prompt: PromptSettings) -> Self {
        Self {
            sensor,
            prompt,
            serial: tokio::sync::Mutex::new(()),
            phase: Mutex::new(AuthPhase::Idle),
        }
    }

    fn set_phase(&self, phase: AuthPhase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = phase;
    }

    /// Phase of the current (or most recent) authentication
    pub fn phase(&self) -> AuthPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn availability(&self) -> BiometricAvailability {
        self.sensor.availability()
    }

    pub fn is_biometric_available(&self) -> bool {
        self.availability() == BiometricAvailability::Available
    }

    /// Prompt and wait for the outcome, at most `timeout`
    ///
    /// Never fails: a sensor that stays silent yields a TIMEOUT result, and
    /// any callback after that is ignored. Time spent waiting for an earlier
    /// prompt to finish counts against `timeout`.
    pub async fn authenticate(&self, timeout: Duration) -> AuthResult {
        let deadline = Instant::now() + timeout;

        let _serial = match tokio::time::timeout_at(deadline, self.serial.lock()).await {
            Ok(guard) if Instant::now() < deadline => guard,
            _ => {
                warn!(
                    timeout_ms = timeout.as_millis(),
                    "Another biometric prompt outlasted the timeout"
                );
                return AuthResult::timeout();
            }
        };

        let request = AuthRequest::new(&self.prompt);
        let request_id = request.id;
        let (tx, mut rx) = oneshot::channel();
        let slot = Arc::new(ResultSlot::new(request_id, tx));
        let callback = AuthCallback {
            slot: Arc::clone(&slot),
        };

        self.set_phase(AuthPhase::Prompted);
        info!(%request_id, timeout_ms = timeout.as_millis(), "Biometric prompt requested");

        let sensor = Arc::clone(&self.sensor);
        tokio::spawn(async move {
            sensor.prompt(request, callback);
        });

        let result = match tokio::time::timeout_at(deadline, &mut rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => AuthResult::sensor_error("prompt ended without a result"),
            Err(_) if slot.claim() => {
                warn!(%request_id, "Biometric prompt timed out");
                AuthResult::timeout()
            }
            // The callback claimed the slot as the timer fired; its send follows immediately
            Err(_) => rx
                .await
                .unwrap_or_else(|_| AuthResult::sensor_error("prompt ended without a result")),
        };

        self.set_phase(AuthPhase::Resolved);
        info!(
            %request_id,
            success = result.success,
            code = ?result.error_code,
            "Biometric prompt resolved"
        );
        result
    }
}

impl std::fmt::Debug for BiometricResultBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BiometricResultBridge")
            .field("phase", &self.phase())
            .field("prompt", &self.prompt)
            .finish()
    }
}
