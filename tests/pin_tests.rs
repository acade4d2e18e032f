// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the backup PIN

mod common;

use common::{fast_config, harness};
use device_bridge::backends::biometric::NoSensor;
use device_bridge::backends::texture::InProcessTextures;
use device_bridge::constants::credentials::BACKUP_PIN_KEY;
use device_bridge::storage::{CredentialStore, FileCredentialStore};
use device_bridge::{Collaborators, Config, DeviceBridge};
use std::path::Path;
use std::sync::Arc;

fn file_backed(path: &Path) -> DeviceBridge {
    let config = Config {
        credential_path: Some(path.to_path_buf()),
        ..Config::default()
    };
    let store = config.credential_path().unwrap();
    let (bridge, _events) = DeviceBridge::new(
        &config,
        Collaborators {
            camera: Arc::new(common::FakeCamera::new()),
            surfaces: Arc::new(InProcessTextures::new()),
            sensor: Arc::new(NoSensor),
            credentials: Arc::new(FileCredentialStore::new(store)),
            decoder: None,
        },
    );
    bridge
}

#[tokio::test]
async fn test_verify_is_false_when_nothing_saved() {
    let h = harness(&fast_config());
    assert!(!h.bridge.verify_pin("0000").await.unwrap());
    assert!(!h.bridge.verify_pin("").await.unwrap());
}

#[tokio::test]
async fn test_verify_matches_last_saved_pin_only() {
    let h = harness(&fast_config());

    h.bridge.save_encrypted_pin("1234").await.unwrap();
    assert!(h.bridge.verify_pin("1234").await.unwrap());
    assert!(!h.bridge.verify_pin("12345").await.unwrap());

    h.bridge.save_encrypted_pin("9876").await.unwrap();
    assert!(!h.bridge.verify_pin("1234").await.unwrap());
    assert!(h.bridge.verify_pin("9876").await.unwrap());
}

#[tokio::test]
async fn test_store_never_sees_the_plain_pin() {
    let h = harness(&fast_config());
    h.bridge.save_encrypted_pin("424242").await.unwrap();

    let stored = h.credentials.get(BACKUP_PIN_KEY).unwrap().unwrap();
    assert!(!stored.contains("424242"));
}

#[tokio::test]
async fn test_pin_persists_across_bridges() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("secure_prefs.json");

    file_backed(&path).save_encrypted_pin("2468").await.unwrap();

    let reopened = file_backed(&path);
    assert!(reopened.verify_pin("2468").await.unwrap());
    assert!(!reopened.verify_pin("1357").await.unwrap());
}
