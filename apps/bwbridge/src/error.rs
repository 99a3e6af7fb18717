use bridge_core::CoreError;

use common::ErrorLocation;

use thiserror::Error;

/// Errors surfaced by the command line front end.
#[derive(Debug, Error)]
pub enum BwBridgeError {
    /// Error from this app
    #[error("BwBridge Error: {message} {location}")]
    App {
        message: String,
        location: ErrorLocation,
    },

    /// Error from bridge-core (config, key store, bridge actor, credentials)
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The bridge settled in a status other than connected
    #[error("Not Connected Error: {status} {location}")]
    NotConnected {
        status: String,
        location: ErrorLocation,
    },
}

impl BwBridgeError {
    #[track_caller]
    pub fn app(message: impl Into<String>) -> Self {
        BwBridgeError::App {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }
}

impl From<bridge_core::error::config::ConfigError> for BwBridgeError {
    fn from(e: bridge_core::error::config::ConfigError) -> Self {
        BwBridgeError::Core(e.into())
    }
}

impl From<bridge_core::BridgeError> for BwBridgeError {
    fn from(e: bridge_core::BridgeError) -> Self {
        BwBridgeError::Core(e.into())
    }
}

impl From<bridge_core::CredentialError> for BwBridgeError {
    fn from(e: bridge_core::CredentialError) -> Self {
        BwBridgeError::Core(e.into())
    }
}
