// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Output surface defaults
pub mod surface {
    /// Default preview buffer width requested by `get_camera_texture`
    pub const DEFAULT_WIDTH: u32 = 1280;

    /// Default preview buffer height requested by `get_camera_texture`
    pub const DEFAULT_HEIGHT: u32 = 720;
}

/// Timing constants
pub mod timing {
    use super::Duration;

    /// How long `authenticate_with_biometrics` waits for the sensor
    pub const AUTH_TIMEOUT: Duration = Duration::from_millis(10_000);

    /// Grace period for the decode worker to exit before it is detached
    pub const SHUTDOWN_GRACE: Duration = Duration::from_millis(1_000);

    /// Upper bound on camera acquisition during `start`
    pub const CAMERA_ACQUIRE_TIMEOUT: Duration = Duration::from_millis(5_000);

    /// Still-image camera frame interval (~30 fps)
    pub const STILL_IMAGE_FRAME_INTERVAL: Duration = Duration::from_millis(33);

    /// Frame counter modulo for periodic logging
    pub const FRAME_LOG_INTERVAL: u64 = 30;
}

/// QR decoding parameters
pub mod decode {
    /// Frames larger than this (either side) are downscaled before detection.
    /// QR codes are typically large enough to be found at this resolution.
    pub const MAX_DIMENSION: u32 = 640;
}

/// Biometric prompt text
pub mod prompt {
    pub const TITLE: &str = "Biometric authentication";
    pub const SUBTITLE: &str = "Authenticate using your biometrics";
    /// Label of the button that falls back to PIN entry
    pub const NEGATIVE_BUTTON: &str = "Use PIN";
}

/// Credential storage keys and locations
pub mod credentials {
    /// Key the hashed backup PIN is stored under
    pub const BACKUP_PIN_KEY: &str = "backup_pin";

    /// File name of the on-disk credential store
    pub const STORE_FILE_NAME: &str = "secure_prefs.json";
}

/// Supported still-image file formats for the still-image camera
pub mod file_formats {
    /// Supported image file extensions
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

    /// Check if a file extension is a supported image format
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }
}

/// Application identity
pub mod app_info {
    /// Directory name used under the platform config/data dirs
    pub const DIR_NAME: &str = "device-bridge";

    /// Config file name
    pub const CONFIG_FILE_NAME: &str = "config.json";

    /// Version string including git metadata
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }
}
