//! Shared-key handling with redacted Debug output.

use crate::{ErrorLocation, RedactError};

use std::fmt;
use std::panic::Location;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::ser::Error;
use zeroize::{Zeroize, Zeroizing};

/// The Base64 form of the symmetric key agreed with the peer.
///
/// This is what gets persisted between sessions. It never prints its value.
#[derive(Clone, PartialEq, Eq)]
pub struct RedactedSharedKey {
    inner: String,
}

impl RedactedSharedKey {
    /// Wrap an already Base64-encoded key.
    pub fn new(encoded: String) -> Self {
        Self { inner: encoded }
    }

    /// Encode raw key bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            inner: BASE64.encode(bytes),
        }
    }

    /// Base64 text, for writing to the key store.
    ///
    /// # Security Note
    /// Only call this when actually persisting the key.
    #[inline]
    pub fn as_base64(&self) -> &str {
        &self.inner
    }

    /// Decode the raw key bytes. The buffer is wiped when dropped.
    #[track_caller]
    pub fn decode(&self) -> Result<Zeroizing<Vec<u8>>, RedactError> {
        BASE64
            .decode(self.inner.as_bytes())
            .map(Zeroizing::new)
            .map_err(|e| RedactError::Decode {
                message: format!("Shared key is not valid Base64: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for RedactedSharedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RedactedSharedKey([REDACTED])")
    }
}

impl fmt::Display for RedactedSharedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED SHARED KEY]")
    }
}

impl Drop for RedactedSharedKey {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

// Prevent accidental serialization
impl serde::Serialize for RedactedSharedKey {
    fn serialize<S>(&self, _serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        Err(S::Error::custom(RedactError::Serialization {
            message: String::from(
                "RedactedSharedKey cannot be serialized - use as_base64() explicitly",
            ),
            location: ErrorLocation::from(Location::caller()),
        }))
    }
}
