use crate::error::protocol::ProtocolError;
use crate::message::{
    COMMAND_CREDENTIAL_CREATE, COMMAND_CREDENTIAL_RETRIEVAL, COMMAND_CREDENTIAL_UPDATE,
    COMMAND_HANDSHAKE, COMMAND_STATUS, PROTOCOL_VERSION,
};

use serde::{Deserialize, Serialize};

/// Outer message sent to the peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub message_id: String,
    pub version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<HandshakePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_command: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakePayload {
    pub public_key: String,
    pub application_name: String,
}

impl Request {
    pub fn handshake(
        message_id: impl Into<String>,
        public_key: impl Into<String>,
        application_name: impl Into<String>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            version: PROTOCOL_VERSION,
            command: Some(COMMAND_HANDSHAKE.to_string()),
            payload: Some(HandshakePayload {
                public_key: public_key.into(),
                application_name: application_name.into(),
            }),
            encrypted_command: None,
        }
    }

    pub fn encrypted_command(message_id: impl Into<String>, encrypted: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            version: PROTOCOL_VERSION,
            command: None,
            payload: None,
            encrypted_command: Some(encrypted.into()),
        }
    }

    #[track_caller]
    pub fn to_bytes(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Plaintext body that gets encrypted into `encryptedCommand`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedCommand {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<CommandPayload>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_id: Option<String>,
}

impl EncryptedCommand {
    pub fn status() -> Self {
        Self {
            command: COMMAND_STATUS.to_string(),
            payload: None,
        }
    }

    pub fn credential_retrieval(uri: impl Into<String>) -> Self {
        Self {
            command: COMMAND_CREDENTIAL_RETRIEVAL.to_string(),
            payload: Some(CommandPayload {
                uri: Some(uri.into()),
                ..CommandPayload::default()
            }),
        }
    }

    pub fn credential_create(payload: CommandPayload) -> Self {
        Self {
            command: COMMAND_CREDENTIAL_CREATE.to_string(),
            payload: Some(payload),
        }
    }

    pub fn credential_update(payload: CommandPayload) -> Self {
        Self {
            command: COMMAND_CREDENTIAL_UPDATE.to_string(),
            payload: Some(payload),
        }
    }

    #[track_caller]
    pub fn to_bytes(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(serde_json::to_vec(self)?)
    }
}
