use bwbridge::app::{collaborators, run, settle};
use bwbridge::cli::Cli;
use bwbridge::error::BwBridgeError;

use bridge_core::{BridgeConfig, BridgeHandle};

use models::ConnectionStatus;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tempfile::TempDir;

fn missing_peer_config() -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.peer.executable_path = PathBuf::from("/nonexistent/bwbridge-test/Bitwarden");
    config
}

/// **VALUE**: The real collaborators report a missing peer without spawning anything.
///
/// **WHY THIS MATTERS**: This is the path every machine without Bitwarden takes.
/// It runs real discovery, the real actor and the real scheduler.
///
/// **BUG THIS CATCHES**: `settle` returning the initial `Disabled` status, or
/// waiting forever because `NotInstalled` was treated as transient.
#[tokio::test]
async fn given_peer_not_installed_when_settling_then_not_installed() {
    // GIVEN: A bridge wired the way the binary wires it
    let dir = TempDir::new().expect("temp dir");
    let config = missing_peer_config();
    let parts = collaborators(&config, dir.path());
    let (handle, task) = BridgeHandle::spawn(config, parts);

    // WHEN: Settling
    let status = settle(&handle, Duration::from_secs(10))
        .await
        .expect("settles");

    // THEN: NotInstalled, and the bridge stops cleanly
    assert_eq!(status, ConnectionStatus::NotInstalled);
    handle.shutdown().await.expect("actor alive");
    task.await.expect("actor exits");
}

#[tokio::test]
async fn given_peer_not_installed_when_running_retrieve_then_not_connected_error() {
    // GIVEN: A config dir whose config points at a missing peer
    let dir = TempDir::new().expect("temp dir");
    missing_peer_config().save(dir.path()).expect("saves");
    let config_dir = dir.path().to_string_lossy().to_string();
    let cli = Cli::try_parse_from([
        "bwbridge",
        "--config-dir",
        config_dir.as_str(),
        "--timeout",
        "10s",
        "retrieve",
        "https://example.com",
    ])
    .expect("parses");

    // WHEN: Running the command
    let result = run(cli).await;

    // THEN: Refused with the settled status
    match result {
        Err(BwBridgeError::NotConnected { status, .. }) => {
            assert_eq!(status, ConnectionStatus::NotInstalled.to_string())
        }
        other => panic!("expected NotConnected, got {other:?}"),
    }
}

#[tokio::test]
async fn given_disabled_config_when_running_then_refuses_before_starting() {
    let dir = TempDir::new().expect("temp dir");
    let mut config = missing_peer_config();
    config.enabled = false;
    config.save(dir.path()).expect("saves");
    let config_dir = dir.path().to_string_lossy().to_string();
    let cli = Cli::try_parse_from(["bwbridge", "--config-dir", config_dir.as_str(), "status"])
        .expect("parses");

    let result = run(cli).await;

    let err = result.expect_err("disabled integration");
    assert!(err.to_string().contains("disabled"), "{err}");
}
