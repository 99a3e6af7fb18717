use crate::error::config::ConfigError;

use common::ErrorLocation;

use std::io::ErrorKind;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_VERSION: u32 = 1;

pub const DEFAULT_APPLICATION_NAME: &str = "Bitwarden";
pub const DEFAULT_BUNDLE_PATH: &str = "/Applications/Bitwarden.app";
pub const DEFAULT_EXECUTABLE_PATH: &str =
    const_format::concatcp!(DEFAULT_BUNDLE_PATH, "/Contents/MacOS/", DEFAULT_APPLICATION_NAME);
pub const DEFAULT_EXTENSION_ARGUMENT: &str = "chrome-extension://bitwarden";
pub const DEFAULT_INTEGRATION_FLAG: &str = "enableDuckDuckGoBrowserIntegration";

// ============================================
// CONFIG STRUCTS
// ============================================

/// How to find and launch the peer application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerConfig {
    #[serde(default = "default_executable_path")]
    pub executable_path: PathBuf,
    #[serde(default = "default_arguments")]
    pub arguments: Vec<String>,
    #[serde(default = "default_process_name")]
    pub process_name: String,
    /// Peer settings file holding the integration flag. `None` skips the check.
    #[serde(default)]
    pub settings_path: Option<PathBuf>,
    #[serde(default = "default_integration_flag")]
    pub integration_flag: String,
    #[serde(default = "default_application_name")]
    pub application_name: String,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            executable_path: default_executable_path(),
            arguments: default_arguments(),
            process_name: default_process_name(),
            settings_path: None,
            integration_flag: default_integration_flag(),
            application_name: default_application_name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_status_refresh_interval_ms")]
    pub status_refresh_interval_ms: u64,
    /// Wait after `connected` before the first status request. Best effort:
    /// it gives the peer time to finish its own setup, nothing more.
    #[serde(default = "default_initial_status_delay_ms")]
    pub initial_status_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: default_reconnect_delay_ms(),
            status_refresh_interval_ms: default_status_refresh_interval_ms(),
            initial_status_delay_ms: default_initial_status_delay_ms(),
        }
    }
}

impl TimingConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn status_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.status_refresh_interval_ms)
    }

    pub fn initial_status_delay(&self) -> Duration {
        Duration::from_millis(self.initial_status_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Whether this password manager is the selected one.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub peer: PeerConfig,

    #[serde(default)]
    pub timing: TimingConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            enabled: default_enabled(),
            peer: PeerConfig::default(),
            timing: TimingConfig::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_enabled() -> bool {
    true
}
fn default_executable_path() -> PathBuf {
    PathBuf::from(DEFAULT_EXECUTABLE_PATH)
}
fn default_arguments() -> Vec<String> {
    vec![DEFAULT_EXTENSION_ARGUMENT.to_string()]
}
fn default_process_name() -> String {
    DEFAULT_APPLICATION_NAME.to_string()
}
fn default_integration_flag() -> String {
    DEFAULT_INTEGRATION_FLAG.to_string()
}
fn default_application_name() -> String {
    DEFAULT_APPLICATION_NAME.to_string()
}
fn default_reconnect_delay_ms() -> u64 {
    1000
}
fn default_status_refresh_interval_ms() -> u64 {
    2000
}
fn default_initial_status_delay_ms() -> u64 {
    2000
}

// ============================================
// IMPLEMENTATION
// ============================================

impl BridgeConfig {
    pub fn path(config_dir: &Path) -> PathBuf {
        config_dir.join(CONFIG_FILE_NAME)
    }

    /// Read `config.json` from `config_dir`. A missing file yields the
    /// defaults; a present but unreadable, malformed or invalid one is an error.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = Self::path(config_dir);

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No bridge config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                warn!("Bridge config unreadable: {e}");
                return Err(ConfigError::ReadError {
                    location: ErrorLocation::from(Location::caller()),
                    path,
                    source: e,
                });
            }
        };

        let config: Self = serde_json::from_str(&contents).map_err(|e| {
            warn!("Bridge config is not valid JSON: {e}");
            ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: path.clone(),
                reason: e.to_string(),
            }
        })?;
        config.validate()?;

        debug!("Bridge config loaded from {}", path.display());
        Ok(config)
    }

    /// Validate, then write through a temporary file renamed into place.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        let write_error = |path: &Path, source: std::io::Error| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: path.to_path_buf(),
            source,
        };

        std::fs::create_dir_all(config_dir).map_err(|e| write_error(config_dir, e))?;

        let json = serde_json::to_vec_pretty(self).map_err(|e| ConfigError::SerializeError {
            location: ErrorLocation::from(Location::caller()),
            reason: e.to_string(),
        })?;

        let path = Self::path(config_dir);
        let staging = config_dir.join(format!("{CONFIG_FILE_NAME}.tmp"));
        std::fs::write(&staging, json).map_err(|e| write_error(&staging, e))?;
        std::fs::rename(&staging, &path).map_err(|e| write_error(&path, e))?;

        info!("Bridge config written to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| {
            Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason,
            })
        };

        if !(1..=CONFIG_VERSION).contains(&self.version) {
            return invalid(format!(
                "version {} is outside 1..={CONFIG_VERSION}",
                self.version
            ));
        }
        if self.peer.executable_path.as_os_str().is_empty() {
            return invalid("peer.executable_path cannot be empty".to_string());
        }
        if self.peer.application_name.is_empty() {
            return invalid("peer.application_name cannot be empty".to_string());
        }
        if self.timing.reconnect_delay_ms == 0 || self.timing.status_refresh_interval_ms == 0 {
            return invalid(format!(
                "timer intervals must be non-zero (reconnect {}ms, status refresh {}ms)",
                self.timing.reconnect_delay_ms, self.timing.status_refresh_interval_ms
            ));
        }

        Ok(())
    }
}
