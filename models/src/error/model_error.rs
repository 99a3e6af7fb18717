use crate::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ModelError {
    #[error("Validation Error: {message} {location}")]
    Validation {
        message: String,
        location: ErrorLocation,
    },

    #[error("Unknown Vault Status: {value} {location}")]
    UnknownVaultStatus {
        value: String,
        location: ErrorLocation,
    },
}
