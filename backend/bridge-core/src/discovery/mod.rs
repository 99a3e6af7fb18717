//! Questions the connection manager asks about the local machine.
//!
//! Each is a trait so the state machine can be driven without a real peer
//! installed. The local implementations live in [`installation`] and
//! [`process`].

pub mod installation;
pub mod process;

pub use installation::LocalInstallation;
pub use process::SysinfoRunningCheck;

use models::InstallationState;

pub trait InstallationCheck: Send {
    fn installation_state(&self) -> InstallationState;

    /// Whether the user enabled this integration in the peer's settings.
    fn is_integration_approved(&self) -> bool;
}

pub trait RunningApplicationCheck: Send {
    fn is_running(&self) -> bool;
}

/// Whether the peer is the password manager the user picked.
pub trait PasswordManagerSelection: Send {
    fn is_selected(&self) -> bool;
}

/// Selection fixed at startup, usually from [`BridgeConfig::enabled`](crate::config::BridgeConfig).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticSelection(pub bool);

impl PasswordManagerSelection for StaticSelection {
    fn is_selected(&self) -> bool {
        self.0
    }
}
