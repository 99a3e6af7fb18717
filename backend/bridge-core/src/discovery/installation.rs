use crate::config::PeerConfig;
use crate::discovery::InstallationCheck;

use models::InstallationState;

use std::path::PathBuf;

use log::{debug, trace, warn};
use serde_json::Value;

/// Looks for the peer on disk and reads its settings file.
///
/// Version detection is not available from the executable alone, so this
/// never reports [`InstallationState::OldVersion`].
#[derive(Debug, Clone)]
pub struct LocalInstallation {
    executable_path: PathBuf,
    settings_path: Option<PathBuf>,
    integration_flag: String,
}

impl LocalInstallation {
    pub fn new(
        executable_path: impl Into<PathBuf>,
        settings_path: Option<PathBuf>,
        integration_flag: impl Into<String>,
    ) -> Self {
        Self {
            executable_path: executable_path.into(),
            settings_path,
            integration_flag: integration_flag.into(),
        }
    }

    pub fn from_config(peer: &PeerConfig) -> Self {
        Self::new(
            peer.executable_path.clone(),
            peer.settings_path.clone(),
            peer.integration_flag.clone(),
        )
    }
}

impl InstallationCheck for LocalInstallation {
    fn installation_state(&self) -> InstallationState {
        if self.executable_path.is_file() {
            InstallationState::Installed
        } else {
            trace!("No peer executable at {}", self.executable_path.display());
            InstallationState::NotInstalled
        }
    }

    fn is_integration_approved(&self) -> bool {
        let Some(ref settings_path) = self.settings_path else {
            return true;
        };

        let contents = match std::fs::read_to_string(settings_path) {
            Ok(contents) => contents,
            Err(e) => {
                debug!(
                    "Peer settings not readable at {}: {e}",
                    settings_path.display()
                );
                return false;
            }
        };

        match serde_json::from_str::<Value>(&contents) {
            Ok(settings) => find_flag(&settings, &self.integration_flag),
            Err(e) => {
                warn!(
                    "Peer settings at {} are not valid JSON: {e}",
                    settings_path.display()
                );
                false
            }
        }
    }
}

/// `true` if any object in `value` maps `flag` to `true`.
pub(crate) fn find_flag(value: &Value, flag: &str) -> bool {
    match value {
        Value::Object(map) => {
            matches!(map.get(flag), Some(Value::Bool(true)))
                || map.values().any(|nested| find_flag(nested, flag))
        }
        Value::Array(items) => items.iter().any(|nested| find_flag(nested, flag)),
        _ => false,
    }
}
