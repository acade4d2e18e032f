// SPDX-License-Identifier: GPL-3.0-only

//! Device bridge - camera QR scanning and biometric prompts for a calling layer
//!
//! This library turns two callback-driven device subsystems into bounded
//! request/response operations:
//!
//! - a camera frame stream, decoded for QR codes one frame at a time with a
//!   keep-latest queue in front of the decoder;
//! - a biometric prompt whose callback is bridged into an `async` call with
//!   a hard timeout and exactly-once result delivery.
//!
//! # Architecture
//!
//! - [`bridge`]: the [`DeviceBridge`] facade the caller talks to
//! - [`session`]: capture session lifecycle
//! - [`frame_processor`]: keep-latest queue, decode worker and QR detection
//! - [`surface`]: ownership of the preview output surface
//! - [`biometric`]: callback-to-result bridge and the backup PIN
//! - [`backends`]: camera, sensor and texture implementations
//! - [`config`], [`storage`]: configuration and credential persistence

pub mod backends;
pub mod biometric;
pub mod bridge;
pub mod config;
pub mod constants;
pub mod errors;
pub mod frame_processor;
pub mod session;
pub mod storage;
pub mod surface;

// Re-export commonly used types
pub use biometric::{AuthErrorCode, AuthResult};
pub use bridge::{Collaborators, DeviceBridge};
pub use config::Config;
pub use errors::{BridgeError, BridgeResult};
pub use frame_processor::{ScanEvents, ScanResult};
pub use session::{CameraTexture, SessionState};
