// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! Each command builds a [`DeviceBridge`] from host-side collaborators:
//! - the still-image camera feeds a file through the real scan pipeline;
//! - the file credential store backs the PIN commands;
//! - there is no biometric hardware on the command line, so prompts fail fast.

use device_bridge::backends::biometric::NoSensor;
use device_bridge::backends::camera::{CameraProvider, StillImageCamera};
use device_bridge::backends::texture::InProcessTextures;
use device_bridge::storage::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
use device_bridge::{Collaborators, Config, DeviceBridge, ScanEvents};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn build(
    config: &Config,
    camera: Arc<dyn CameraProvider>,
    credentials: Arc<dyn CredentialStore>,
) -> (DeviceBridge, ScanEvents) {
    DeviceBridge::new(
        config,
        Collaborators {
            camera,
            surfaces: Arc::new(InProcessTextures::new()),
            sensor: Arc::new(NoSensor),
            credentials,
            decoder: None,
        },
    )
}

fn credential_store(config: &Config) -> Result<Arc<dyn CredentialStore>, Box<dyn std::error::Error>> {
    let path = config
        .credential_path()
        .ok_or("No data directory available for the credential store")?;
    Ok(Arc::new(FileCredentialStore::new(path)))
}

/// Scan an image file and print the first result as JSON
pub async fn scan_image(config: &Config, image: PathBuf, timeout_secs: u64) -> CliResult {
    if !image.is_file() {
        return Err(format!("Not a file: {}", image.display()).into());
    }

    let camera = Arc::new(StillImageCamera::new(
        image,
        config.still_image_frame_interval(),
    ));
    let (bridge, mut events) = build(config, camera, Arc::new(MemoryCredentialStore::new()));

    bridge.start_scanner().await?;
    let texture = bridge.get_camera_texture().await?;
    eprintln!(
        "Preview texture {} ({}x{})",
        texture.texture_id, texture.width, texture.height
    );

    let outcome = tokio::time::timeout(Duration::from_secs(timeout_secs), events.recv()).await;
    bridge.dispose_camera_texture().await;
    bridge.stop_scanner().await;

    match outcome {
        Ok(Some(result)) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Ok(None) => Err("Scan event stream closed".into()),
        Err(_) => Err(format!("No QR code found within {}s", timeout_secs).into()),
    }
}

pub async fn set_pin(config: &Config, pin: &str) -> CliResult {
    if pin.is_empty() {
        return Err("PIN must not be empty".into());
    }
    let (bridge, _events) = build(config, no_camera(config), credential_store(config)?);
    bridge.save_encrypted_pin(pin).await?;
    println!("PIN saved");
    Ok(())
}

pub async fn verify_pin(config: &Config, pin: &str) -> CliResult {
    let (bridge, _events) = build(config, no_camera(config), credential_store(config)?);
    let matches = bridge.verify_pin(pin).await?;
    println!("{}", serde_json::json!({ "verified": matches }));
    if matches {
        Ok(())
    } else {
        Err("PIN does not match".into())
    }
}

pub fn biometric_status(config: &Config) -> CliResult {
    let (bridge, _events) = build(
        config,
        no_camera(config),
        Arc::new(MemoryCredentialStore::new()),
    );
    println!(
        "{}",
        serde_json::json!({
            "available": bridge.is_biometric_available(),
            "availability": bridge.biometric_availability(),
        })
    );
    Ok(())
}

pub async fn biometric_auth(config: &Config) -> CliResult {
    let (bridge, _events) = build(
        config,
        no_camera(config),
        Arc::new(MemoryCredentialStore::new()),
    );
    let result = bridge.authenticate_with_biometrics().await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

// PIN and biometric commands never start the scanner; the camera is never opened
fn no_camera(config: &Config) -> Arc<dyn CameraProvider> {
    Arc::new(StillImageCamera::new(
        PathBuf::new(),
        config.still_image_frame_interval(),
    ))
}
