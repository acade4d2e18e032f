// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for configuration module

use device_bridge::Config;
use device_bridge::errors::ConfigError;
use std::time::Duration;

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!((config.texture_width, config.texture_height), (1280, 720));
    assert_eq!(config.auth_timeout(), Duration::from_secs(10));
    assert_eq!(config.shutdown_grace(), Duration::from_millis(1000));
    assert_eq!(config.prompt.negative_button, "Use PIN");
    assert!(config.credential_path.is_none());
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(&dir.path().join("config.json")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_partial_file_keeps_other_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{ "auth_timeout_ms": 3000, "prompt": { "title": "Unlock" } }"#)
        .unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.auth_timeout(), Duration::from_secs(3));
    assert_eq!(config.prompt.title, "Unlock");
    assert_eq!(config.prompt.negative_button, "Use PIN");
    assert_eq!(config.texture_width, 1280);
}

#[test]
fn test_save_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let config = Config {
        texture_width: 640,
        texture_height: 480,
        credential_path: Some(dir.path().join("prefs.json")),
        ..Config::default()
    };
    config.save(&path).unwrap();

    assert_eq!(Config::load(&path).unwrap(), config);
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ texture_width: ").unwrap();

    let err = Config::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn test_explicit_credential_path_wins() {
    let config = Config {
        credential_path: Some("/tmp/prefs.json".into()),
        ..Config::default()
    };
    assert_eq!(
        config.credential_path().as_deref(),
        Some(std::path::Path::new("/tmp/prefs.json"))
    );
}
