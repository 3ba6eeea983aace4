//! Error types for faucet-two-core.

use thiserror::Error;

/// Core library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Raw HID layer failure (enumeration, open, write).
    #[error("HID error: {0}")]
    Hid(String),

    /// No device matching the vendor/product ID is attached.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// The device was found but could not be opened, even after the retry.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Writing a report to an open device failed.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// Malformed caller input; no state was changed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A bounded device operation did not complete in time.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Lighting profile serialization/deserialization error.
    #[error("profile error: {0}")]
    Profile(String),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
