use serde::Serialize;

/// What the local installation check found on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InstallationState {
    Installed,
    NotInstalled,
    /// Installed, but too old to speak the desktop-proxy protocol.
    OldVersion,
}
