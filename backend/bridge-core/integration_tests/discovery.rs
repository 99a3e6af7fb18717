use bridge_core::config::PeerConfig;
use bridge_core::discovery::{
    InstallationCheck, LocalInstallation, RunningApplicationCheck, SysinfoRunningCheck,
};

use models::InstallationState;

use std::path::PathBuf;

use tempfile::TempDir;

const FLAG: &str = "enableDuckDuckGoBrowserIntegration";

fn installation(dir: &TempDir, settings: Option<&str>) -> LocalInstallation {
    let executable = dir.path().join("Bitwarden");
    std::fs::write(&executable, b"").expect("writes executable");

    let settings_path = settings.map(|contents| {
        let path = dir.path().join("data.json");
        std::fs::write(&path, contents).expect("writes settings");
        path
    });

    LocalInstallation::new(executable, settings_path, FLAG)
}

#[test]
fn given_executable_on_disk_when_checked_then_installed() {
    let dir = TempDir::new().expect("temp dir");

    let state = installation(&dir, None).installation_state();

    assert_eq!(state, InstallationState::Installed);
}

#[test]
fn given_no_executable_when_checked_then_not_installed() {
    let peer = PeerConfig {
        executable_path: PathBuf::from("/nonexistent/Bitwarden.app/Contents/MacOS/Bitwarden"),
        ..PeerConfig::default()
    };

    let state = LocalInstallation::from_config(&peer).installation_state();

    assert_eq!(state, InstallationState::NotInstalled);
}

#[test]
fn given_directory_at_executable_path_when_checked_then_not_installed() {
    let dir = TempDir::new().expect("temp dir");

    let state = LocalInstallation::new(dir.path(), None, FLAG).installation_state();

    assert_eq!(state, InstallationState::NotInstalled);
}

#[test]
fn given_no_settings_path_when_checking_approval_then_approved() {
    let dir = TempDir::new().expect("temp dir");

    assert!(installation(&dir, None).is_integration_approved());
}

#[test]
fn given_settings_with_flag_enabled_when_checking_approval_then_approved() {
    let dir = TempDir::new().expect("temp dir");
    let settings = format!(r#"{{ "global": {{ "{FLAG}": true }} }}"#);

    assert!(installation(&dir, Some(&settings)).is_integration_approved());
}

/// **VALUE**: Anything short of an explicit `true` counts as not approved.
///
/// **WHY THIS MATTERS**: Starting the proxy without the user's approval makes
/// the peer pop up a prompt the user never asked for.
///
/// **BUG THIS CATCHES**: Defaulting to approved when the settings file is
/// missing, unreadable or malformed.
#[test]
fn given_settings_without_approval_when_checking_then_not_approved() {
    for contents in [
        format!(r#"{{ "{FLAG}": false }}"#),
        "{}".to_string(),
        "not json".to_string(),
    ] {
        let dir = TempDir::new().expect("temp dir");

        assert!(
            !installation(&dir, Some(&contents)).is_integration_approved(),
            "{contents} should not count as approved"
        );
    }
}

#[test]
fn given_settings_path_without_file_when_checking_approval_then_not_approved() {
    let dir = TempDir::new().expect("temp dir");
    let installation = LocalInstallation::new(
        dir.path().join("Bitwarden"),
        Some(dir.path().join("missing.json")),
        FLAG,
    );

    assert!(!installation.is_integration_approved());
}

#[test]
fn given_unlikely_process_name_when_scanning_then_not_running() {
    let check = SysinfoRunningCheck::new("definitely-not-bitwarden-7f3a");

    assert!(!check.is_running());
}

#[test]
fn given_own_executable_name_when_scanning_then_running() {
    // GIVEN: This test binary's own file name
    let exe = std::env::current_exe().expect("current exe");
    let Some(name) = exe.file_name().map(|name| name.to_string_lossy().to_string()) else {
        return;
    };

    // WHEN/THEN: The scan finds us
    assert!(SysinfoRunningCheck::new(name).is_running());
}
