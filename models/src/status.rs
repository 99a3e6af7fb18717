//! The single observable connection status.

use crate::vault::Vault;

use std::fmt::{Display, Formatter, Result as FormatResult};

use serde::Serialize;

/// Why the bridge ended up in [`ConnectionStatus::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BridgeErrorKind {
    RunningOfProxyProcessFailed,
    HandshakeFailed,
    DecryptionOfSharedKeyFailed,
    DecryptionOfDataFailed,
    StoringOfSharedKeyFailed,
    SharedKeyInjectionFailed,
    NoActiveVault,
    StatusParsingFailed,
    ParsingFailed,
    SendingOfStatusMessageFailed,
    FrameStreamCorrupted,
    BitwardenCannotDecrypt,
    BitwardenRespondedWithError,
}

/// Connection status of the bridge. Exactly one value is current at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "camelCase")]
pub enum ConnectionStatus {
    #[default]
    Disabled,
    NotInstalled,
    OldVersion,
    NotRunning,
    IntegrationNotApproved,
    MissingHandshake,
    Connecting,
    WaitingForStatusResponse,
    Connected { vault: Vault },
    HandshakeNotApproved,
    Error { kind: BridgeErrorKind },
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected { .. })
    }

    pub fn vault(&self) -> Option<&Vault> {
        match self {
            ConnectionStatus::Connected { vault } => Some(vault),
            _ => None,
        }
    }

    pub fn error(kind: BridgeErrorKind) -> Self {
        ConnectionStatus::Error { kind }
    }
}

impl Display for ConnectionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        match self {
            ConnectionStatus::Connected { vault } => {
                write!(f, "connected({} {})", vault.id, vault.status)
            }
            ConnectionStatus::Error { kind } => write!(f, "error({kind:?})"),
            other => write!(f, "{other:?}"),
        }
    }
}
