//! Connection state machine and the actor that runs it.

pub mod event;
pub mod handle;
pub mod manager;
pub mod pending;

pub use event::{BridgeCommand, BridgeEvent};
pub use handle::BridgeHandle;
pub use manager::{BridgeManager, Collaborators};
