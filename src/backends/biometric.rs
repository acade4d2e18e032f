// SPDX-License-Identifier: GPL-3.0-only

//! Biometric sensor abstraction
//!
//! A sensor shows a prompt and, at some later point and from any thread,
//! reports the outcome through the [`AuthCallback`] it was handed. The
//! bridge on the other side of the callback guarantees the caller sees
//! exactly one result.

use crate::biometric::{AuthCallback, AuthRequest};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What the capability check reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BiometricAvailability {
    /// Strong biometrics enrolled and usable
    Available,
    /// The device has no biometric sensor
    NoHardware,
    /// Sensor present but nothing enrolled
    NotEnrolled,
    /// Sensor present but currently unusable (locked out, busy, ...)
    Unavailable,
}

/// Platform biometric prompt
pub trait BiometricSensor: Send + Sync {
    /// Synchronous capability check, free of side effects
    fn availability(&self) -> BiometricAvailability;

    /// Show the prompt and return without waiting for the user
    ///
    /// Terminal outcomes (success, unrecoverable error, user cancel) are
    /// reported through `callback`. A rejected fingerprint that lets the user
    /// retry is not terminal and must not be reported.
    fn prompt(&self, request: AuthRequest, callback: AuthCallback);
}

/// Sensor for hosts without biometric hardware
///
/// Every prompt resolves immediately with a sensor error.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSensor;

impl BiometricSensor for NoSensor {
    fn availability(&self) -> BiometricAvailability {
        BiometricAvailability::NoHardware
    }

    fn prompt(&self, request: AuthRequest, callback: AuthCallback) {
        debug!(request_id = %request.id, "No biometric hardware, failing prompt");
        callback.error("no biometric hardware available");
    }
}
