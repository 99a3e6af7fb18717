//! The `2.<iv>|<data>|<mac>` string carried in `encryptedCommand`.

use crate::error::protocol::ProtocolError;

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

/// Encryption type tag: AES-256-CBC with HMAC-SHA256, Base64 parts.
pub const ENCRYPTION_TYPE: &str = "2";

const TYPE_SEPARATOR: char = '.';
const PART_SEPARATOR: char = '|';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedString {
    pub iv: Vec<u8>,
    pub data: Vec<u8>,
    pub mac: Vec<u8>,
}

impl Display for EncryptedString {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        write!(
            f,
            "{ENCRYPTION_TYPE}{TYPE_SEPARATOR}{}{PART_SEPARATOR}{}{PART_SEPARATOR}{}",
            BASE64.encode(&self.iv),
            BASE64.encode(&self.data),
            BASE64.encode(&self.mac)
        )
    }
}

impl FromStr for EncryptedString {
    type Err = ProtocolError;

    #[track_caller]
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (kind, rest) = value
            .split_once(TYPE_SEPARATOR)
            .ok_or_else(|| ProtocolError::parsing_failed("Encrypted string has no type tag"))?;

        if kind != ENCRYPTION_TYPE {
            return Err(ProtocolError::unexpected_shape(format!(
                "Unsupported encryption type: {kind}"
            )));
        }

        let parts: Vec<&str> = rest.split(PART_SEPARATOR).collect();
        let [iv, data, mac] = parts.as_slice() else {
            return Err(ProtocolError::parsing_failed(format!(
                "Encrypted string has {} parts, expected 3",
                parts.len()
            )));
        };

        Ok(Self {
            iv: decode_part("iv", iv)?,
            data: decode_part("data", data)?,
            mac: decode_part("mac", mac)?,
        })
    }
}

#[track_caller]
pub(crate) fn decode_part(name: &str, value: &str) -> Result<Vec<u8>, ProtocolError> {
    BASE64
        .decode(value.as_bytes())
        .map_err(|e| ProtocolError::parsing_failed(format!("Invalid Base64 in {name}: {e}")))
}
