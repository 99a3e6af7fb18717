use crate::error::model_error::ModelError;
use crate::ErrorLocation;

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::panic::Location;
use std::str::FromStr;

use serde::Serialize;

const LOCKED: &str = "locked";
const UNLOCKED: &str = "unlocked";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VaultStatus {
    Locked,
    Unlocked,
}

impl VaultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VaultStatus::Locked => LOCKED,
            VaultStatus::Unlocked => UNLOCKED,
        }
    }
}

impl FromStr for VaultStatus {
    type Err = ModelError;

    #[track_caller]
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            LOCKED => Ok(VaultStatus::Locked),
            UNLOCKED => Ok(VaultStatus::Unlocked),
            other => Err(ModelError::UnknownVaultStatus {
                value: other.to_string(),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}

impl Display for VaultStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        f.write_str(self.as_str())
    }
}

/// The peer's active account, as reported by the last status response.
///
/// Replaced wholesale on every refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vault {
    pub id: String,
    pub email: String,
    pub status: VaultStatus,
    pub active: bool,
}

impl Vault {
    pub fn new(id: impl Into<String>, email: impl Into<String>, status: VaultStatus) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            status,
            active: true,
        }
    }

    /// Same vault, reported locked.
    pub fn locked(&self) -> Self {
        Self {
            status: VaultStatus::Locked,
            ..self.clone()
        }
    }

    pub fn is_locked(&self) -> bool {
        self.status == VaultStatus::Locked
    }
}
