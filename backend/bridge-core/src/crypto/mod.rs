//! Handshake key pair and authenticated symmetric encryption.
//!
//! The handshake uses RSA-OAEP(SHA-1): we send our public key, the peer
//! answers with a 64-byte shared key encrypted to it. Everything after that is
//! AES-256-CBC with PKCS#7 padding and an HMAC-SHA256 over `iv || ciphertext`.
//! The MAC is always checked before any decryption is attempted.

pub mod shared_key;

pub use shared_key::SharedKey;

use crate::error::crypto::CryptoError;
use crate::message::EncryptedString;

use aes::Aes256;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use log::debug;
use rand::RngCore;
use rsa::pkcs8::EncodePublicKey;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use sha2::Sha256;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_RSA_BITS: usize = 2048;
pub const IV_LEN: usize = 16;

/// Output of [`CryptoChannel::encrypt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encrypted {
    pub iv: Vec<u8>,
    pub data: Vec<u8>,
    pub mac: Vec<u8>,
}

impl From<Encrypted> for EncryptedString {
    fn from(encrypted: Encrypted) -> Self {
        EncryptedString {
            iv: encrypted.iv,
            data: encrypted.data,
            mac: encrypted.mac,
        }
    }
}

pub struct CryptoChannel {
    key_bits: usize,
    private_key: Option<RsaPrivateKey>,
    shared_key: Option<SharedKey>,
}

impl Default for CryptoChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptoChannel {
    pub fn new() -> Self {
        Self::with_key_bits(DEFAULT_RSA_BITS)
    }

    pub fn with_key_bits(key_bits: usize) -> Self {
        Self {
            key_bits,
            private_key: None,
            shared_key: None,
        }
    }

    /// Create a fresh key pair and return the public half as Base64 SPKI DER.
    ///
    /// Replaces any previous pair, so shared keys encrypted to the old public
    /// key can no longer be recovered.
    #[track_caller]
    pub fn generate_key_pair(&mut self) -> Result<String, CryptoError> {
        let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), self.key_bits)
            .map_err(|e| CryptoError::key_generation(format!("RSA key generation failed: {e}")))?;

        let der = RsaPublicKey::from(&private_key)
            .to_public_key_der()
            .map_err(|e| CryptoError::key_generation(format!("Public key encoding failed: {e}")))?;

        self.private_key = Some(private_key);
        debug!("Generated {}-bit handshake key pair", self.key_bits);

        Ok(BASE64.encode(der.as_bytes()))
    }

    /// Recover the shared key the peer encrypted to our public key.
    #[track_caller]
    pub fn decrypt_shared_key(&self, encrypted_b64: &str) -> Result<SharedKey, CryptoError> {
        let private_key = self
            .private_key
            .as_ref()
            .ok_or_else(|| CryptoError::missing_key("No handshake key pair"))?;

        let ciphertext = BASE64.decode(encrypted_b64.as_bytes()).map_err(|e| {
            CryptoError::decryption_failed(format!("Shared key is not valid Base64: {e}"))
        })?;

        let plain = zeroize::Zeroizing::new(
            private_key
                .decrypt(Oaep::new::<Sha1>(), &ciphertext)
                .map_err(|e| CryptoError::decryption_failed(format!("RSA-OAEP failed: {e}")))?,
        );

        SharedKey::from_slice(&plain).ok_or_else(|| {
            CryptoError::decryption_failed(format!(
                "Shared key has {} bytes, expected {}",
                plain.len(),
                shared_key::SHARED_KEY_LEN
            ))
        })
    }

    /// Install a previously stored key. `false` if it has the wrong length.
    pub fn set_shared_key(&mut self, bytes: &[u8]) -> bool {
        match SharedKey::from_slice(bytes) {
            Some(key) => {
                self.shared_key = Some(key);
                true
            }
            None => false,
        }
    }

    pub fn install_shared_key(&mut self, key: SharedKey) {
        self.shared_key = Some(key);
    }

    pub fn has_shared_key(&self) -> bool {
        self.shared_key.is_some()
    }

    #[track_caller]
    pub fn encrypt(&self, plain: &[u8]) -> Result<Encrypted, CryptoError> {
        let key = self
            .shared_key
            .as_ref()
            .ok_or_else(|| CryptoError::missing_key("No shared key installed"))?;

        let mut iv = vec![0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        let data = Aes256CbcEnc::new_from_slices(key.enc_key(), &iv)
            .map_err(|e| CryptoError::encryption_failed(format!("Cipher setup failed: {e}")))?
            .encrypt_padded_vec_mut::<Pkcs7>(plain);

        let mac = compute_mac(key, &iv, &data)
            .map_err(|e| CryptoError::encryption_failed(format!("MAC setup failed: {e}")))?;

        Ok(Encrypted { iv, data, mac })
    }

    /// Authenticate, then decrypt. A bad MAC never yields plaintext.
    #[track_caller]
    pub fn decrypt(&self, data: &[u8], iv: &[u8], mac: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let key = self
            .shared_key
            .as_ref()
            .ok_or_else(|| CryptoError::missing_key("No shared key installed"))?;

        let mut verifier = <HmacSha256 as Mac>::new_from_slice(key.mac_key())
            .map_err(|e| CryptoError::decryption_failed(format!("MAC setup failed: {e}")))?;
        verifier.update(iv);
        verifier.update(data);
        verifier
            .verify_slice(mac)
            .map_err(|_| CryptoError::decryption_failed("MAC mismatch"))?;

        Aes256CbcDec::new_from_slices(key.enc_key(), iv)
            .map_err(|e| CryptoError::decryption_failed(format!("Cipher setup failed: {e}")))?
            .decrypt_padded_vec_mut::<Pkcs7>(data)
            .map_err(|e| CryptoError::decryption_failed(format!("Invalid padding: {e}")))
    }

    /// Encrypt a command body into the `2.iv|data|mac` wire string.
    #[track_caller]
    pub fn encrypt_command(&self, command_json: &[u8]) -> Result<String, CryptoError> {
        let encrypted = self.encrypt(command_json)?;
        Ok(EncryptedString::from(encrypted).to_string())
    }

    /// Drop the key pair and the shared key.
    pub fn clean_keys(&mut self) {
        self.private_key = None;
        self.shared_key = None;
    }
}

fn compute_mac(
    key: &SharedKey,
    iv: &[u8],
    data: &[u8],
) -> Result<Vec<u8>, hmac::digest::InvalidLength> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key.mac_key())?;
    mac.update(iv);
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
