use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ProtocolError {
    #[error("Parsing Failed: {message} {location}")]
    ParsingFailed {
        message: String,
        location: ErrorLocation,
    },

    #[error("Unexpected Message Shape: {message} {location}")]
    UnexpectedMessageShape {
        message: String,
        location: ErrorLocation,
    },
}

impl ProtocolError {
    #[track_caller]
    pub fn parsing_failed(message: impl Into<String>) -> Self {
        ProtocolError::ParsingFailed {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn unexpected_shape(message: impl Into<String>) -> Self {
        ProtocolError::UnexpectedMessageShape {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<serde_json::Error> for ProtocolError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        ProtocolError::ParsingFailed {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
