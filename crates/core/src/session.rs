//! Device session: connect with one retry, periodic report writes, close.
//!
//! ```text
//! Uninitialized -> Connecting -> Connected -> Closed
//!                             -> NotFound
//!                             -> Failed
//! ```
//!
//! `NotFound` and `Failed` end that attempt; only a new [`DeviceSession::connect`]
//! tries again. While not connected, [`DeviceSession::tick`] does nothing.

use crate::device::{find_faucet_two, DeviceInfo};
use crate::error::{Error, Result};
use crate::report::{ReportState, Rgb, Side, REPORT_LEN};
use crate::transport::{HidBackend, ReportSink};
use crate::{FAUCET_TWO_PID, FAUCET_TWO_VID};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Wait between the failed open and its single retry.
pub const OPEN_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Connecting,
    Connected,
    /// No device with the FaucetTwo VID/PID was attached.
    NotFound,
    /// The device was found but both open attempts failed.
    Failed,
    Closed,
}

/// Options for [`DeviceSession::connect_with`].
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub retry_backoff: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            retry_backoff: OPEN_RETRY_BACKOFF,
        }
    }
}

/// Outcome of a successful tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    /// No device connected; nothing written.
    Idle,
    /// Report written; byte count reported by the device layer.
    Sent(usize),
}

/// Shared, lock-protected [`ReportState`].
///
/// Clones share the same state, so a setter thread and the tick thread can
/// each hold one.
#[derive(Debug, Clone, Default)]
pub struct ReportHandle {
    inner: Arc<Mutex<ReportState>>,
}

impl ReportHandle {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic mid-update cannot leave a field half-written, so a poisoned
    // lock still guards a usable state.
    fn lock(&self) -> MutexGuard<'_, ReportState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// See [`ReportState::set_lights`].
    pub fn set_lights(&self, side: Side, position: u8, color: Rgb) -> bool {
        self.lock().set_lights(side, position, color)
    }

    /// See [`ReportState::set_buttons`].
    pub fn set_buttons(&self, bits: &[u8]) -> Result<()> {
        self.lock().set_buttons(bits)
    }

    /// Run `f` with exclusive access to the state.
    pub fn update<T>(&self, f: impl FnOnce(&mut ReportState) -> T) -> T {
        f(&mut *self.lock())
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> ReportState {
        self.lock().clone()
    }

    /// Encode the current state under the lock.
    pub fn encode(&self) -> [u8; REPORT_LEN] {
        self.lock().encode()
    }
}

/// One FaucetTwo connection and the report it keeps sending.
pub struct DeviceSession {
    state: SessionState,
    report: ReportHandle,
    sink: Option<Box<dyn ReportSink>>,
    device: Option<DeviceInfo>,
}

impl Default for DeviceSession {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceSession {
    pub fn new() -> Self {
        Self::with_report(ReportHandle::new())
    }

    /// Session driving an externally shared report.
    pub fn with_report(report: ReportHandle) -> Self {
        Self {
            state: SessionState::Uninitialized,
            report,
            sink: None,
            device: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.sink.is_some()
    }

    /// The connected device, if any.
    pub fn device(&self) -> Option<&DeviceInfo> {
        self.device.as_ref()
    }

    /// Handle to the report this session sends.
    pub fn report(&self) -> ReportHandle {
        self.report.clone()
    }

    pub fn set_lights(&self, side: Side, position: u8, color: Rgb) -> bool {
        self.report.set_lights(side, position, color)
    }

    pub fn set_buttons(&self, bits: &[u8]) -> Result<()> {
        self.report.set_buttons(bits)
    }

    /// Connect with the default one-second retry backoff.
    pub fn connect(&mut self, backend: &dyn HidBackend) -> Result<()> {
        self.connect_with(backend, &ConnectOptions::default())
    }

    /// Find the first FaucetTwo and open it, retrying the open once after
    /// `options.retry_backoff`. Blocks for the backoff on a failed first open.
    ///
    /// Already connected sessions are left as they are.
    pub fn connect_with(&mut self, backend: &dyn HidBackend, options: &ConnectOptions) -> Result<()> {
        if self.is_connected() {
            debug!("Session already connected");
            return Ok(());
        }
        self.state = SessionState::Connecting;

        let devices = match backend.enumerate() {
            Ok(devices) => devices,
            Err(e) => {
                error!(error = %e, "HID enumeration failed");
                self.state = SessionState::Failed;
                return Err(Error::ConnectionFailed(format!("enumeration: {e}")));
            }
        };

        let Some(info) = find_faucet_two(&devices).cloned() else {
            error!(
                vid = format_args!("0x{:04X}", FAUCET_TWO_VID),
                pid = format_args!("0x{:04X}", FAUCET_TWO_PID),
                scanned = devices.len(),
                "Could not find FaucetTwo device"
            );
            self.state = SessionState::NotFound;
            return Err(Error::DeviceNotFound(format!(
                "no HID device with VID=0x{FAUCET_TWO_VID:04X} PID=0x{FAUCET_TWO_PID:04X}"
            )));
        };

        let sink = match backend.open(&info) {
            Ok(sink) => sink,
            Err(first) => {
                warn!(
                    error = %first,
                    backoff_ms = options.retry_backoff.as_millis() as u64,
                    "Connection failed, retrying"
                );
                std::thread::sleep(options.retry_backoff);
                match backend.open(&info) {
                    Ok(sink) => sink,
                    Err(e) => {
                        error!(error = %e, path = %info.path, "Connection retry failed");
                        self.state = SessionState::Failed;
                        return Err(Error::ConnectionFailed(format!(
                            "{} after retry: {e}",
                            info.path
                        )));
                    }
                }
            }
        };

        self.report.update(ReportState::init_modes);
        info!(path = %info.path, "FaucetTwo device opened successfully");
        self.sink = Some(sink);
        self.device = Some(info);
        self.state = SessionState::Connected;
        Ok(())
    }

    /// Encode the current report and write it to the device.
    ///
    /// A failed write is logged and returned as [`Error::WriteFailed`]; the
    /// session stays connected and the next tick writes again.
    pub fn tick(&mut self) -> Result<TickStatus> {
        let Some(sink) = self.sink.as_mut() else {
            return Ok(TickStatus::Idle);
        };

        let bytes = self.report.encode();
        trace!(report_hex = format_args!("{:02X?}", bytes), "FaucetTwo TX");

        match sink.write_report(&bytes) {
            Ok(n) => Ok(TickStatus::Sent(n)),
            Err(e) => {
                warn!(error = %e, "Report write failed");
                Err(Error::WriteFailed(e.to_string()))
            }
        }
    }

    /// Close the device if open. Safe to call repeatedly.
    pub fn disconnect(&mut self) {
        if let Some(mut sink) = self.sink.take() {
            sink.close();
            self.state = SessionState::Closed;
            if let Some(info) = self.device.take() {
                info!(path = %info.path, "FaucetTwo device closed");
            }
        }
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}
