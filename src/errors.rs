// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the device bridge
//!
//! Each collaborator has its own error enum. [`BridgeError`] is what the
//! caller-facing operations return. Per-frame [`DecodeError`]s never reach
//! the caller; they are logged and the frame is dropped. Biometric failures
//! are not errors at all, they resolve into an
//! [`AuthResult`](crate::biometric::AuthResult).

use crate::backends::camera::PixelFormat;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using BridgeError
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors surfaced to the calling layer
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The camera could not be acquired; the session is back to Idle
    #[error("resource acquisition failed: {0}")]
    ResourceAcquisition(#[source] CameraError),
    /// The output surface could not be created or bound
    #[error(transparent)]
    SurfaceBind(#[from] SurfaceBindError),
    /// PIN persistence failed
    #[error(transparent)]
    Credential(#[from] CredentialError),
}

/// Camera provider and handle errors
#[derive(Debug, Clone, Error)]
pub enum CameraError {
    /// No camera could be opened
    #[error("camera unavailable: {0}")]
    Unavailable(String),
    /// The provider did not answer within the acquisition timeout
    #[error("camera acquisition timed out after {0:?}")]
    AcquisitionTimedOut(Duration),
    /// Binding preview/analysis outputs to the camera failed
    #[error("failed to bind camera: {0}")]
    BindFailed(String),
}

/// Output surface errors
#[derive(Debug, Clone, Error)]
pub enum SurfaceBindError {
    /// The surface factory refused to allocate a surface
    #[error("failed to create {width}x{height} surface: {reason}")]
    CreateFailed {
        width: u32,
        height: u32,
        reason: String,
    },
    /// Zero-sized surfaces are never requested from the factory
    #[error("invalid surface size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
    /// The camera rejected the surface it was asked to render into
    #[error("camera rejected surface: {0}")]
    Camera(#[from] CameraError),
}

/// Per-frame decode failures (never fatal)
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    /// The decoder has no luma extraction for this layout
    #[error("unsupported pixel format {0:?}")]
    UnsupportedFormat(PixelFormat),
    /// The buffer is shorter than width/height/stride imply
    #[error("frame buffer truncated: need {expected} bytes, have {actual}")]
    Truncated { expected: usize, actual: usize },
    /// Decoder backend failure
    #[error("decoder failure: {0}")]
    Backend(String),
}

/// Credential store and PIN vault errors
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("credential store at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to hash pin: {0}")]
    Hash(String),
    /// The blocking task running the hash did not complete
    #[error("pin task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Configuration load/save errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no configuration directory available on this system")]
    NoConfigDir,
    #[error("config I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
