//! Bridge between this application and the Bitwarden desktop app.
//!
//! The peer is reached through a proxy executable it ships. We launch it,
//! exchange length-prefixed JSON frames over its stdio, agree on a shared key
//! with an RSA handshake and then send encrypted commands. The connection
//! state machine lives in [`connection`]; [`BridgeHandle`] is what the rest of
//! the application talks to.

pub mod config;
pub mod connection;
pub mod credentials;
pub mod crypto;
pub mod discovery;
pub mod error;
pub mod frame;
pub mod key_store;
pub mod message;
pub mod process;
pub mod scheduler;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

#[cfg(test)]
mod tests;

pub use config::BridgeConfig;
pub use connection::{BridgeHandle, BridgeManager, Collaborators};
pub use error::{BridgeError, CoreError, CredentialError};
pub use key_store::{FileKeyStore, MemoryKeyStore, SharedKeyStore};

pub use models::{BridgeErrorKind, ConnectionStatus, Credential, Vault, VaultStatus};
