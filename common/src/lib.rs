//! Shared building blocks for the password-manager bridge.
//!
//! Everything here is independent of the peer protocol:
//!
//! - [`ErrorLocation`]: the `[file:line:column]` tag carried by every error
//! - [`RedactedSharedKey`]: key material that never shows up in logs
//!
//! Both `models` and `bridge-core` depend on this crate.

pub mod error;
pub mod redacted_key;

pub use error::error_location::ErrorLocation;
pub use error::redact_error::RedactError;
pub use redacted_key::RedactedSharedKey;
