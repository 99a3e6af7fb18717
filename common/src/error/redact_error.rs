use crate::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum RedactError {
    #[error("Serialization Error: {message} {location}")]
    Serialization {
        message: String,
        location: ErrorLocation,
    },

    #[error("Decode Error: {message} {location}")]
    Decode {
        message: String,
        location: ErrorLocation,
    },
}
