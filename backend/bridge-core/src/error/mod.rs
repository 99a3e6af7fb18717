pub mod bridge;
pub mod config;
pub mod credential;
pub mod crypto;
pub mod frame;
pub mod key_store;
pub mod process;
pub mod protocol;

pub use bridge::BridgeError;
pub use credential::CredentialError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Bridge(#[from] bridge::BridgeError),

    #[error(transparent)]
    Frame(#[from] frame::FrameError),

    #[error(transparent)]
    Process(#[from] process::ProcessError),

    #[error(transparent)]
    Crypto(#[from] crypto::CryptoError),

    #[error(transparent)]
    Protocol(#[from] protocol::ProtocolError),

    #[error(transparent)]
    KeyStore(#[from] key_store::KeyStoreError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Credential(#[from] credential::CredentialError),
}
