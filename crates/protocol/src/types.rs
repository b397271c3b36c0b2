//! Device identification types

use serde::{Deserialize, Serialize};

/// USB vendor ID of the launcher
pub const LAUNCHER_VENDOR_ID: u16 = 0x0416;

/// USB product ID of the launcher
pub const LAUNCHER_PRODUCT_ID: u16 = 0x9391;

/// Launcher found on the bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Bus number
    pub bus_number: u8,
    /// Device address on the bus
    pub device_address: u8,
    /// USB Vendor ID
    pub vendor_id: u16,
    /// USB Product ID
    pub product_id: u16,
    /// Manufacturer string (if available)
    pub manufacturer: Option<String>,
    /// Product string (if available)
    pub product: Option<String>,
    /// Whether a session is bound to this device
    pub attached: bool,
}

impl DeviceInfo {
    /// (bus, address) key
    pub fn location(&self) -> (u8, u8) {
        (self.bus_number, self.device_address)
    }
}
