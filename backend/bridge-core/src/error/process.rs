use crate::error::frame::FrameError;

use common::ErrorLocation;

use std::io::Error as IoError;
use std::panic::Location;
use std::path::PathBuf;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ProcessError {
    #[error("Spawn Failed: {message} ({path}) {location}")]
    SpawnFailed {
        message: String,
        path: PathBuf,
        location: ErrorLocation,
        #[source]
        source: IoError,
    },

    #[error("Not Running: {message} {location}")]
    NotRunning {
        message: String,
        location: ErrorLocation,
    },

    #[error("Pipe Error: {message} {location}")]
    Pipe {
        message: String,
        location: ErrorLocation,
    },

    #[error(transparent)]
    Frame(#[from] FrameError),
}

impl ProcessError {
    #[track_caller]
    pub fn not_running(message: impl Into<String>) -> Self {
        ProcessError::NotRunning {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn pipe(message: impl Into<String>) -> Self {
        ProcessError::Pipe {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
