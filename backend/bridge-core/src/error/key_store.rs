use common::ErrorLocation;

use std::path::PathBuf;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum KeyStoreError {
    #[error("Key Store Read Error: {path}: {source} {location}")]
    Read {
        location: ErrorLocation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Key Store Write Error: {path}: {source} {location}")]
    Write {
        location: ErrorLocation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Key Store Corrupted: {reason} {location}")]
    Corrupted {
        location: ErrorLocation,
        reason: String,
    },
}
