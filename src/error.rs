//! Error types for the mount core.
//!
//! Two families exist:
//!
//! - [`MountError`]: soft failures while touching shared mount state.
//!   They are never fatal; the caller skips the operation and retries on
//!   its next cycle.
//! - [`ProtocolError`]: the wire error taxonomy. Each variant maps to the
//!   numeric code and message of an `! <code> <message>` line.

use thiserror::Error;

/// Failure to access shared mount state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MountError {
    /// A shared-state lock was not acquired within the configured timeout.
    #[error("timed out waiting for {0} lock")]
    LockTimeout(&'static str),
}

/// Error reported to the external controller as an error line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The line did not start with `+`, or had unexpected trailing tokens.
    #[error("Invalid command received")]
    InvalidCommand,
    /// A positional argument was missing or malformed.
    #[error("Invalid parameter received")]
    InvalidParameter,
    /// The command name has no mapping.
    #[error("Unknown command received")]
    UnknownCommand,
    /// The command was understood but could not be executed.
    #[error("{0}")]
    Internal(&'static str),
}

impl ProtocolError {
    /// Numeric code written on the error line.
    ///
    /// ```rust
    /// use esp_mount::error::ProtocolError;
    ///
    /// assert_eq!(ProtocolError::Internal("x").code(), 1);
    /// assert_eq!(ProtocolError::InvalidParameter.code(), 2);
    /// assert_eq!(ProtocolError::UnknownCommand.code(), 3);
    /// ```
    pub const fn code(&self) -> u8 {
        match self {
            ProtocolError::Internal(_) => 1,
            ProtocolError::InvalidCommand | ProtocolError::InvalidParameter => 2,
            ProtocolError::UnknownCommand => 3,
        }
    }
}

impl From<MountError> for ProtocolError {
    fn from(err: MountError) -> Self {
        match err {
            MountError::LockTimeout("time") => ProtocolError::Internal("Time lock unavailable"),
            MountError::LockTimeout("position") => {
                ProtocolError::Internal("Position lock unavailable")
            }
            MountError::LockTimeout("track buffer") => {
                ProtocolError::Internal("Track buffer lock unavailable")
            }
            MountError::LockTimeout(_) => ProtocolError::Internal("Shared state unavailable"),
        }
    }
}
