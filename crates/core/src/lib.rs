//! faucet-two-core: FaucetTwo LED report model, device discovery, and session.
//!
//! This crate composes the controller's fixed 32-byte LED/button output
//! report and keeps a single USB HID connection open to push it on every
//! host tick.

pub mod device;
pub mod error;
pub mod hid;
pub mod profile;
pub mod report;
pub mod session;
pub mod transport;

/// FaucetTwo USB Vendor ID.
pub const FAUCET_TWO_VID: u16 = 0x0E8F;

/// FaucetTwo USB Product ID.
pub const FAUCET_TWO_PID: u16 = 0x1118;
