use bridge_core::config::BridgeConfig;
use bridge_core::error::config::ConfigError;

use std::path::PathBuf;

use tempfile::TempDir;

#[test]
fn given_no_config_file_when_loading_then_defaults() {
    let dir = TempDir::new().expect("temp dir");

    let config = BridgeConfig::load(dir.path()).expect("missing file is not an error");

    assert_eq!(config, BridgeConfig::default());
}

#[test]
fn given_saved_config_when_loading_then_same_values_and_no_temp_file() {
    // GIVEN: A customised config saved to disk
    let dir = TempDir::new().expect("temp dir");
    let mut config = BridgeConfig::default();
    config.enabled = false;
    config.peer.executable_path = PathBuf::from("/opt/bitwarden/bitwarden");
    config.peer.settings_path = Some(PathBuf::from("/home/u/.config/Bitwarden/data.json"));
    config.timing.reconnect_delay_ms = 5000;
    config.save(dir.path()).expect("saves");

    // WHEN: Loading it back
    let loaded = BridgeConfig::load(dir.path()).expect("loads");

    // THEN: Identical, and the atomic write left nothing behind
    assert_eq!(loaded, config);
    assert!(!dir.path().join("config.json.tmp").exists());
}

#[test]
fn given_config_dir_missing_when_saving_then_it_is_created() {
    let dir = TempDir::new().expect("temp dir");
    let nested = dir.path().join("a").join("b");

    BridgeConfig::default().save(&nested).expect("saves");

    assert!(nested.join("config.json").is_file());
}

#[test]
fn given_corrupted_file_when_loading_then_parse_error() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join("config.json"), "{ not json").expect("writes");

    let result = BridgeConfig::load(dir.path());

    assert!(matches!(result, Err(ConfigError::ParseError { .. })));
}

/// **VALUE**: Hand-edited values are validated on load, not only on save.
///
/// **WHY THIS MATTERS**: Users edit the JSON directly. A zero retry delay
/// loaded unchecked would make the bridge relaunch the peer in a busy loop.
///
/// **BUG THIS CATCHES**: `load()` skipping `validate()`.
#[test]
fn given_invalid_values_on_disk_when_loading_then_validation_error() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(
        dir.path().join("config.json"),
        r#"{ "timing": { "reconnect_delay_ms": 0 } }"#,
    )
    .expect("writes");

    let result = BridgeConfig::load(dir.path());

    assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
}

#[test]
fn given_invalid_config_when_saving_then_nothing_is_written() {
    let dir = TempDir::new().expect("temp dir");
    let mut config = BridgeConfig::default();
    config.version = 0;

    let result = config.save(dir.path());

    assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
    assert!(!dir.path().join("config.json").exists());
}
