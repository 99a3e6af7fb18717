//! Length-prefixed framing of the pipe byte stream.
//!
//! Every message on the wire is a 4-byte little-endian length followed by
//! exactly that many payload bytes. Pipe reads deliver arbitrary chunks, so
//! [`FrameCodec`] buffers partial frames across calls to [`FrameCodec::feed`].
//!
//! A declared length above [`MAX_FRAME_LEN`] means the stream is out of sync.
//! The codec does not try to find the next frame boundary; it stays poisoned
//! and the owner must restart the peer process.

use crate::error::frame::FrameError;

use common::ErrorLocation;

use std::panic::Location;

/// Size of the little-endian length prefix.
pub const PREFIX_LEN: usize = 4;

/// Largest payload accepted from the peer (1 MiB).
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

#[derive(Debug, Default)]
pub struct FrameCodec {
    buffer: Vec<u8>,
    poisoned: Option<FrameError>,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix `payload` with its length.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Oversized`] when `payload` is longer than
    /// [`MAX_FRAME_LEN`]; the peer would treat its prefix as malformed.
    #[track_caller]
    pub fn encode(payload: &[u8]) -> Result<Vec<u8>, FrameError> {
        if payload.len() > MAX_FRAME_LEN {
            return Err(FrameError::Oversized {
                len: payload.len(),
                max: MAX_FRAME_LEN,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let mut frame = Vec::with_capacity(PREFIX_LEN + payload.len());
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(payload);
        Ok(frame)
    }

    /// Append `bytes` and return every frame completed by them, in order.
    ///
    /// A trailing partial frame stays buffered for the next call.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::MalformedPrefix`] once a length prefix exceeds
    /// [`MAX_FRAME_LEN`], and the same error on every later call.
    #[track_caller]
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<Vec<u8>>, FrameError> {
        if let Some(ref error) = self.poisoned {
            return Err(error.clone());
        }

        self.buffer.extend_from_slice(bytes);

        let mut frames = Vec::new();
        let mut offset = 0;

        while self.buffer.len() - offset >= PREFIX_LEN {
            let mut prefix = [0u8; PREFIX_LEN];
            prefix.copy_from_slice(&self.buffer[offset..offset + PREFIX_LEN]);
            let declared = u32::from_le_bytes(prefix) as usize;

            if declared > MAX_FRAME_LEN {
                let error = FrameError::MalformedPrefix {
                    declared,
                    max: MAX_FRAME_LEN,
                    location: ErrorLocation::from(Location::caller()),
                };
                self.buffer.clear();
                self.poisoned = Some(error.clone());
                return Err(error);
            }

            let start = offset + PREFIX_LEN;
            if self.buffer.len() - start < declared {
                break;
            }

            frames.push(self.buffer[start..start + declared].to_vec());
            offset = start + declared;
        }

        self.buffer.drain(..offset);
        Ok(frames)
    }

    /// Bytes of an incomplete frame waiting for more input.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned.is_some()
    }
}
