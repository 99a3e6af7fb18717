use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum CryptoError {
    #[error("Key Generation Error: {message} {location}")]
    KeyGeneration {
        message: String,
        location: ErrorLocation,
    },

    #[error("Missing Key Error: {message} {location}")]
    MissingKey {
        message: String,
        location: ErrorLocation,
    },

    #[error("Decryption Failed: {message} {location}")]
    DecryptionFailed {
        message: String,
        location: ErrorLocation,
    },

    #[error("Encryption Failed: {message} {location}")]
    EncryptionFailed {
        message: String,
        location: ErrorLocation,
    },
}

impl CryptoError {
    #[track_caller]
    pub fn key_generation(message: impl Into<String>) -> Self {
        CryptoError::KeyGeneration {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn decryption_failed(message: impl Into<String>) -> Self {
        CryptoError::DecryptionFailed {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn encryption_failed(message: impl Into<String>) -> Self {
        CryptoError::EncryptionFailed {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn missing_key(message: impl Into<String>) -> Self {
        CryptoError::MissingKey {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
