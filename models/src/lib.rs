//! Domain models for the password-manager bridge.
//!
//! This crate contains pure data structures representing the core
//! concepts in the bridge. Models have no business logic - they're
//! just data that can be passed between layers.
//!
//! ## Architecture
//!
//! - **models** (this crate): Pure data structures
//! - **bridge-core**: Protocol, crypto and the connection state machine
//! - **bwbridge**: Binary wiring everything together
//!
//! This layered architecture keeps concerns separated and makes testing easier.

pub mod credential;
pub mod error;
pub mod installation;
pub mod status;
pub mod vault;

pub use common::ErrorLocation;
pub use credential::Credential;
pub use credential::builder::CredentialBuilder;
pub use error::model_error::ModelError;
pub use installation::InstallationState;
pub use status::{BridgeErrorKind, ConnectionStatus};
pub use vault::{Vault, VaultStatus};
