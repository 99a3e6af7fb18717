use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

/// Failures talking to the bridge task itself.
#[derive(Debug, ThisError)]
pub enum BridgeError {
    #[error("Bridge Stopped: {message} {location}")]
    Stopped {
        message: String,
        location: ErrorLocation,
    },
}

impl BridgeError {
    #[track_caller]
    pub fn stopped(message: impl Into<String>) -> Self {
        BridgeError::Stopped {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
