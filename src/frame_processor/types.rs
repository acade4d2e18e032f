// SPDX-License-Identifier: GPL-3.0-only

//! Core types for frame processing results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Symbology of a decoded code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BarcodeFormat {
    QrCode,
    Unknown,
}

impl std::fmt::Display for BarcodeFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BarcodeFormat::QrCode => write!(f, "QR_CODE"),
            BarcodeFormat::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// What a decoder found in one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub content: String,
    pub format: BarcodeFormat,
}

impl Decoded {
    pub fn qr(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            format: BarcodeFormat::QrCode,
        }
    }
}

/// A successful scan, delivered to the caller as an event
///
/// Built once per successful decode and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    content: String,
    format: BarcodeFormat,
    timestamp: DateTime<Utc>,
}

impl ScanResult {
    /// Stamp a decode result with the current time
    pub fn new(decoded: Decoded) -> Self {
        Self {
            content: decoded.content,
            format: decoded.format,
            timestamp: Utc::now(),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn format(&self) -> BarcodeFormat {
        self.format
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
