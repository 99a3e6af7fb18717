use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum FrameError {
    /// The length prefix cannot belong to a real frame; the stream is out of sync.
    #[error("Malformed Frame Prefix: declared {declared} bytes, maximum is {max} {location}")]
    MalformedPrefix {
        declared: usize,
        max: usize,
        location: ErrorLocation,
    },

    /// The payload is too large for the peer to accept.
    #[error("Oversized Frame: payload of {len} bytes, maximum is {max} {location}")]
    Oversized {
        len: usize,
        max: usize,
        location: ErrorLocation,
    },
}
