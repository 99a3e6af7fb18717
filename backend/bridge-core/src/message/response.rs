//! Inbound messages.
//!
//! The peer reuses one loosely typed record for every kind of answer. Decoding
//! here never fails on missing fields; [`Response::kind`] turns the record into
//! an explicit variant for the request the caller is waiting on.

use crate::error::protocol::ProtocolError;
use crate::message::encrypted_string::{EncryptedString, decode_part};
use crate::message::{NOTIFICATION_CONNECTED, NOTIFICATION_DISCONNECTED};

use models::{BridgeErrorKind, Vault, VaultStatus};

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Response {
    pub message_id: Option<String>,
    pub version: Option<u32>,
    pub command: Option<String>,
    pub payload: Option<Payload>,
    pub encrypted_payload: Option<EncryptedPayload>,
}

/// Arrays are tried before single items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Array(Vec<PayloadItem>),
    Item(PayloadItem),
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PayloadItem {
    pub error: Option<String>,
    pub public_key: Option<String>,
    pub application_name: Option<String>,
    pub shared_key: Option<String>,
    pub id: Option<String>,
    pub email: Option<String>,
    pub status: Option<String>,
    pub active: Option<bool>,
    pub user_id: Option<String>,
    pub credential_id: Option<String>,
    pub user_name: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EncryptedPayload {
    pub encryption_type: Option<i64>,
    pub encrypted_string: Option<String>,
    pub data: Option<String>,
    pub iv: Option<String>,
    pub mac: Option<String>,
}

/// Raw bytes of an [`EncryptedPayload`], ready for the crypto channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedParts {
    pub data: Vec<u8>,
    pub iv: Vec<u8>,
    pub mac: Vec<u8>,
}

impl EncryptedPayload {
    #[track_caller]
    pub fn decode_parts(&self) -> Result<EncryptedParts, ProtocolError> {
        let (Some(data), Some(iv), Some(mac)) = (&self.data, &self.iv, &self.mac) else {
            if let Some(ref encrypted) = self.encrypted_string {
                let parsed: EncryptedString = encrypted.parse()?;
                return Ok(EncryptedParts {
                    data: parsed.data,
                    iv: parsed.iv,
                    mac: parsed.mac,
                });
            }
            return Err(ProtocolError::unexpected_shape(
                "Encrypted payload is missing data, iv or mac",
            ));
        };

        Ok(EncryptedParts {
            data: decode_part("data", data)?,
            iv: decode_part("iv", iv)?,
            mac: decode_part("mac", mac)?,
        })
    }
}

/// What the caller is waiting for under a given message id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    Handshake,
    Encrypted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResponse {
    pub status: String,
    pub shared_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseKind {
    Connected,
    Disconnected,
    Handshake(HandshakeResponse),
    Encrypted(EncryptedPayload),
    PeerError(String),
    Unrecognised,
}

impl Response {
    #[track_caller]
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// `connected` and `disconnected` carry no message id and answer nothing.
    pub fn notification(&self) -> Option<ResponseKind> {
        match self.command.as_deref() {
            Some(NOTIFICATION_CONNECTED) => Some(ResponseKind::Connected),
            Some(NOTIFICATION_DISCONNECTED) => Some(ResponseKind::Disconnected),
            _ => None,
        }
    }

    pub fn item(&self) -> Option<&PayloadItem> {
        match self.payload {
            Some(Payload::Item(ref item)) => Some(item),
            _ => None,
        }
    }

    pub fn items(&self) -> Option<&[PayloadItem]> {
        match self.payload {
            Some(Payload::Array(ref items)) => Some(items),
            _ => None,
        }
    }

    pub fn peer_error(&self) -> Option<&str> {
        self.item().and_then(|item| item.error.as_deref())
    }

    pub fn kind(&self, expectation: Expectation) -> ResponseKind {
        if let Some(notification) = self.notification() {
            return notification;
        }

        if let Some(error) = self.peer_error() {
            return ResponseKind::PeerError(error.to_string());
        }

        match expectation {
            Expectation::Handshake => match self.item() {
                Some(PayloadItem {
                    status: Some(status),
                    shared_key: Some(shared_key),
                    ..
                }) => ResponseKind::Handshake(HandshakeResponse {
                    status: status.clone(),
                    shared_key: shared_key.clone(),
                }),
                // A refused handshake may come back without a key.
                Some(PayloadItem {
                    status: Some(status),
                    ..
                }) => ResponseKind::Handshake(HandshakeResponse {
                    status: status.clone(),
                    shared_key: String::new(),
                }),
                _ => ResponseKind::Unrecognised,
            },
            Expectation::Encrypted => match self.encrypted_payload {
                Some(ref payload) => ResponseKind::Encrypted(payload.clone()),
                None => ResponseKind::Unrecognised,
            },
        }
    }

    /// The vault flagged `active` in a status array.
    pub fn active_vault(&self) -> Result<Vault, BridgeErrorKind> {
        let items = self.items().ok_or(BridgeErrorKind::StatusParsingFailed)?;

        let active = items
            .iter()
            .find(|item| item.active.unwrap_or(false))
            .ok_or(BridgeErrorKind::NoActiveVault)?;

        let (Some(id), Some(email), Some(status)) = (&active.id, &active.email, &active.status)
        else {
            return Err(BridgeErrorKind::StatusParsingFailed);
        };

        let status: VaultStatus = status
            .parse()
            .map_err(|_| BridgeErrorKind::StatusParsingFailed)?;

        Ok(Vault::new(id.clone(), email.clone(), status))
    }
}
