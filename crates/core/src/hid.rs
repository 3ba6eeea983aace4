//! `hidapi`-backed implementation of the transport traits.
//!
//! `hid_write` has no timeout of its own, so each opened device is handed to
//! a dedicated I/O worker thread. The caller waits at most [`WRITE_TIMEOUT`]
//! for a write to complete; a stalled transfer only ever blocks the worker.

use crate::device::DeviceInfo;
use crate::error::{Error, Result};
use crate::transport::{HidBackend, ReportSink};
use std::ffi::CString;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError, TrySendError};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

/// Upper bound on how long a tick waits for one report write.
pub const WRITE_TIMEOUT: Duration = Duration::from_millis(250);

/// The system HID subsystem via `hidapi`.
pub struct HidApiBackend {
    api: Mutex<hidapi::HidApi>,
}

impl HidApiBackend {
    /// Initialize hidapi.
    pub fn new() -> Result<Self> {
        let api = hidapi::HidApi::new().map_err(|e| Error::Hid(format!("hidapi init: {e}")))?;
        Ok(Self {
            api: Mutex::new(api),
        })
    }

    fn api(&self) -> MutexGuard<'_, hidapi::HidApi> {
        self.api.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HidBackend for HidApiBackend {
    /// Re-scan the bus, so devices plugged in since the last call show up.
    fn enumerate(&self) -> Result<Vec<DeviceInfo>> {
        let mut api = self.api();
        api.refresh_devices()
            .map_err(|e| Error::Hid(format!("refresh devices: {e}")))?;
        Ok(api
            .device_list()
            .map(|info| DeviceInfo {
                vid: info.vendor_id(),
                pid: info.product_id(),
                path: info.path().to_string_lossy().into_owned(),
                serial: info.serial_number().map(|s| s.to_string()),
                product: info.product_string().map(|s| s.to_string()),
            })
            .collect())
    }

    fn open(&self, device: &DeviceInfo) -> Result<Box<dyn ReportSink>> {
        let path = CString::new(device.path.as_str())
            .map_err(|e| Error::Hid(format!("device path {:?}: {e}", device.path)))?;
        let handle = self.api().open_path(&path).map_err(|e| {
            Error::Hid(format!(
                "open HID device (VID=0x{:04X} PID=0x{:04X}): {e}",
                device.vid, device.pid
            ))
        })?;
        let writer = move |data: &[u8]| handle.write(data).map_err(|e| e.to_string());
        let sink = HidSink::spawn(writer, device.path.clone(), WRITE_TIMEOUT)?;
        Ok(Box::new(sink))
    }
}

type WriteResult = std::result::Result<usize, String>;

struct WriteRequest {
    data: Vec<u8>,
    reply: mpsc::Sender<WriteResult>,
}

/// Output stream to one opened device, driven by an I/O worker thread.
///
/// At most one write is in flight. While a timed-out write is still stuck in
/// the worker, further writes are refused rather than queued, so a stale
/// report is never sent once the stall clears.
pub struct HidSink {
    io_tx: Option<SyncSender<WriteRequest>>,
    /// Reply channel of a write that timed out and has not finished yet.
    pending: Option<Receiver<WriteResult>>,
    path: String,
    timeout: Duration,
}

impl HidSink {
    /// Move `writer` (and the device it owns) onto a worker thread. The
    /// worker lives until the sender is dropped.
    fn spawn<W>(mut writer: W, path: String, timeout: Duration) -> Result<Self>
    where
        W: FnMut(&[u8]) -> WriteResult + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel::<WriteRequest>(1);
        let worker_path = path.clone();
        std::thread::Builder::new()
            .name("faucet-two-io".into())
            .spawn(move || {
                while let Ok(req) = rx.recv() {
                    let _ = req.reply.send(writer(&req.data));
                }
                debug!(path = %worker_path, "HID I/O worker exiting");
            })
            .map_err(|e| Error::Hid(format!("spawn HID I/O worker: {e}")))?;

        Ok(Self {
            io_tx: Some(tx),
            pending: None,
            path,
            timeout,
        })
    }

    /// Whether the worker is still busy with a timed-out write.
    fn still_stalled(&mut self) -> bool {
        let Some(rx) = self.pending.as_ref() else {
            return false;
        };
        match rx.try_recv() {
            Err(TryRecvError::Empty) => true,
            Ok(late) => {
                debug!(path = %self.path, result = ?late, "Stalled write completed");
                self.pending = None;
                false
            }
            Err(TryRecvError::Disconnected) => {
                self.pending = None;
                false
            }
        }
    }
}

impl ReportSink for HidSink {
    fn write_report(&mut self, data: &[u8]) -> Result<usize> {
        if self.still_stalled() {
            return Err(Error::Timeout("previous write still pending".into()));
        }
        let tx = self
            .io_tx
            .as_ref()
            .ok_or_else(|| Error::Hid("device is closed".into()))?;

        let (reply_tx, reply_rx) = mpsc::channel();
        tx.try_send(WriteRequest {
            data: data.to_vec(),
            reply: reply_tx,
        })
        .map_err(|e| match e {
            TrySendError::Full(_) => Error::Timeout("previous write still pending".into()),
            TrySendError::Disconnected(_) => Error::Hid("HID I/O worker has exited".into()),
        })?;

        match reply_rx.recv_timeout(self.timeout) {
            Ok(result) => result.map_err(|e| Error::Hid(format!("write: {e}"))),
            Err(RecvTimeoutError::Timeout) => {
                self.pending = Some(reply_rx);
                Err(Error::Timeout(format!(
                    "hid_write did not complete within {}ms",
                    self.timeout.as_millis()
                )))
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(Error::Hid("HID I/O worker has exited".into()))
            }
        }
    }

    fn close(&mut self) {
        if self.io_tx.take().is_some() {
            info!(path = %self.path, "Closing HID device");
        }
    }
}
