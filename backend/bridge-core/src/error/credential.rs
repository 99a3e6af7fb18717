//! Errors returned to callers of the credential façade.
//!
//! These are per-call results and are never retried by the bridge.

use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum CredentialError {
    #[error("Not Connected: status is {status} {location}")]
    NotConnected {
        status: String,
        location: ErrorLocation,
    },

    #[error("Missing Credential ID: an update needs the stored credential's ID {location}")]
    MissingCredentialId { location: ErrorLocation },

    #[error("Credential Retrieval Failed: {message} {location}")]
    RetrievalFailed {
        message: String,
        location: ErrorLocation,
    },

    #[error("Credential Creation Failed: {message} {location}")]
    CreationFailed {
        message: String,
        location: ErrorLocation,
    },

    #[error("Credential Update Failed: {message} {location}")]
    UpdateFailed {
        message: String,
        location: ErrorLocation,
    },

    #[error("Peer Error: {error} {location}")]
    Peer {
        error: String,
        location: ErrorLocation,
    },

    #[error("Request Failed: {message} {location}")]
    Send {
        message: String,
        location: ErrorLocation,
    },

    #[error("Cancelled: communication was cancelled {location}")]
    Cancelled { location: ErrorLocation },

    #[error("Peer Terminated: the proxy process exited before answering {location}")]
    PeerTerminated { location: ErrorLocation },

    #[error("Bridge Stopped: the bridge task is no longer running {location}")]
    BridgeStopped { location: ErrorLocation },
}

impl CredentialError {
    #[track_caller]
    pub fn not_connected(status: impl ToString) -> Self {
        CredentialError::NotConnected {
            status: status.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn missing_credential_id() -> Self {
        CredentialError::MissingCredentialId {
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn retrieval_failed(message: impl Into<String>) -> Self {
        CredentialError::RetrievalFailed {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn creation_failed(message: impl Into<String>) -> Self {
        CredentialError::CreationFailed {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn update_failed(message: impl Into<String>) -> Self {
        CredentialError::UpdateFailed {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn peer(error: impl Into<String>) -> Self {
        CredentialError::Peer {
            error: error.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn send(message: impl Into<String>) -> Self {
        CredentialError::Send {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn cancelled() -> Self {
        CredentialError::Cancelled {
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn peer_terminated() -> Self {
        CredentialError::PeerTerminated {
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn bridge_stopped() -> Self {
        CredentialError::BridgeStopped {
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
