// SPDX-License-Identifier: GPL-3.0-only

//! Platform backends
//!
//! - [`camera`]: camera acquisition, frame types and the still-image camera
//! - [`biometric`]: biometric sensor trait and the no-hardware sensor
//! - [`texture`]: in-process texture registry for preview surfaces

pub mod biometric;
pub mod camera;
pub mod texture;
