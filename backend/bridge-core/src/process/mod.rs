//! The peer proxy process and its pipes.
//!
//! [`ProxyProcess`] is the seam the connection manager talks to.
//! [`ProcessBridge`] is the real implementation on top of `tokio::process`.

pub mod spawn;

pub use spawn::ProcessBridge;

use crate::error::process::ProcessError;

use std::path::Path;

pub trait ProxyProcess: Send {
    /// Launch the peer. Returns the generation number tagging every event
    /// this instance produces.
    fn start(&mut self, path: &Path, args: &[String]) -> Result<u64, ProcessError>;

    /// Frame `payload` and write it to the peer's stdin.
    fn send(&mut self, payload: &[u8]) -> Result<(), ProcessError>;

    /// Kill the peer if it is running. Safe to call repeatedly.
    fn stop(&mut self);

    fn is_running(&self) -> bool;
}
