use zeroize::Zeroizing;

pub const SHARED_KEY_LEN: usize = 64;
pub const ENC_KEY_LEN: usize = 32;

/// Symmetric key agreed during the handshake.
///
/// The first half encrypts (AES-256), the second half authenticates
/// (HMAC-SHA256). Wiped on drop.
#[derive(Clone)]
pub struct SharedKey {
    bytes: Zeroizing<Vec<u8>>,
}

impl SharedKey {
    /// `None` unless `bytes` is exactly [`SHARED_KEY_LEN`] long.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != SHARED_KEY_LEN {
            return None;
        }

        Some(Self {
            bytes: Zeroizing::new(bytes.to_vec()),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn enc_key(&self) -> &[u8] {
        &self.bytes[..ENC_KEY_LEN]
    }

    pub fn mac_key(&self) -> &[u8] {
        &self.bytes[ENC_KEY_LEN..]
    }
}

impl std::fmt::Debug for SharedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SharedKey([REDACTED])")
    }
}
