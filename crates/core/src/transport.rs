//! HID transport abstraction for device communication.
//!
//! Provides a trait-based transport layer so that real HID devices and
//! mock devices share the same interface.

use crate::device::DeviceInfo;
use crate::error::Result;

/// Access to the host's HID subsystem.
pub trait HidBackend {
    /// List connected HID devices with their vendor/product IDs.
    fn enumerate(&self) -> Result<Vec<DeviceInfo>>;

    /// Open a byte stream to one enumerated device.
    fn open(&self, device: &DeviceInfo) -> Result<Box<dyn ReportSink>>;
}

/// An open output stream to one device.
pub trait ReportSink: Send {
    /// Write one raw output report (report ID first). Returns bytes written.
    fn write_report(&mut self, data: &[u8]) -> Result<usize>;

    /// Release the underlying handle. Dropping the sink has the same effect.
    fn close(&mut self) {}
}
