//! JSON messages exchanged with the peer proxy.
//!
//! Outbound messages are [`Request`]s. Inbound bytes decode into a permissive
//! [`Response`]; the connection manager then asks for a [`ResponseKind`]
//! matching the request it is waiting on.

pub mod encrypted_string;
pub mod message_id;
pub mod request;
pub mod response;

pub use encrypted_string::EncryptedString;
pub use message_id::MessageIdGenerator;
pub use request::{CommandPayload, EncryptedCommand, HandshakePayload, Request};
pub use response::{
    EncryptedParts, EncryptedPayload, Expectation, HandshakeResponse, Payload, PayloadItem,
    Response, ResponseKind,
};

/// Protocol version sent with every request.
pub const PROTOCOL_VERSION: u32 = 1;

pub const COMMAND_HANDSHAKE: &str = "bw-handshake";
pub const COMMAND_STATUS: &str = "bw-status";
pub const COMMAND_CREDENTIAL_RETRIEVAL: &str = "bw-credential-retrieval";
pub const COMMAND_CREDENTIAL_CREATE: &str = "bw-credential-create";
pub const COMMAND_CREDENTIAL_UPDATE: &str = "bw-credential-update";

pub const NOTIFICATION_CONNECTED: &str = "connected";
pub const NOTIFICATION_DISCONNECTED: &str = "disconnected";

pub const PEER_ERROR_CANNOT_DECRYPT: &str = "cannot-decrypt";
pub const PEER_ERROR_LOCKED: &str = "locked";

pub const STATUS_SUCCESS: &str = "success";
