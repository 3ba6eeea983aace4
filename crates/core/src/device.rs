//! Device model: identity and discovery.

use crate::error::Result;
use crate::transport::HidBackend;
use crate::{FAUCET_TWO_PID, FAUCET_TWO_VID};
use tracing::{debug, info};

/// Information about an enumerated HID device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub vid: u16,
    pub pid: u16,
    pub path: String,
    pub serial: Option<String>,
    pub product: Option<String>,
}

impl DeviceInfo {
    /// Whether this entry is a FaucetTwo controller.
    pub fn is_faucet_two(&self) -> bool {
        self.vid == FAUCET_TWO_VID && self.pid == FAUCET_TWO_PID
    }
}

/// First FaucetTwo in an enumeration result.
pub fn find_faucet_two(devices: &[DeviceInfo]) -> Option<&DeviceInfo> {
    devices.iter().find(|d| d.is_faucet_two())
}

/// Enumerate HID devices and keep only FaucetTwo controllers.
pub fn discover_devices(backend: &dyn HidBackend) -> Result<Vec<DeviceInfo>> {
    debug!("Starting HID device enumeration");
    let devices: Vec<DeviceInfo> = backend
        .enumerate()?
        .into_iter()
        .filter(DeviceInfo::is_faucet_two)
        .collect();

    for dev in &devices {
        info!(
            vid = format_args!("0x{:04X}", dev.vid),
            pid = format_args!("0x{:04X}", dev.pid),
            path = %dev.path,
            "Found FaucetTwo device"
        );
    }

    debug!(count = devices.len(), "Device enumeration complete");
    Ok(devices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{self, MockBackend};

    #[test]
    fn recognizes_faucet_two_identity() {
        assert!(mock::faucet_two("a").is_faucet_two());
        assert!(!mock::other_device(0x0E8F, 0x1119, "b").is_faucet_two());
        assert!(!mock::other_device(0x046D, 0x1118, "c").is_faucet_two());
    }

    #[test]
    fn find_returns_first_match() {
        let devices = vec![
            mock::other_device(0x046D, 0xC08D, "mouse"),
            mock::faucet_two("first"),
            mock::faucet_two("second"),
        ];
        assert_eq!(find_faucet_two(&devices).map(|d| d.path.as_str()), Some("first"));
        assert_eq!(find_faucet_two(&devices[..1]), None);
    }

    #[test]
    fn discover_filters_foreign_devices() {
        let backend = MockBackend::new(vec![
            mock::other_device(0x046D, 0xC08D, "mouse"),
            mock::faucet_two("controller"),
        ]);
        let found = discover_devices(&backend).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, "controller");
    }
}
