//! Launcher device abstraction
//!
//! This module provides a wrapper around rusb::Device with a cached
//! descriptor, matching against the configured VID:PID, and opening the
//! command interface for a session.

use crate::usb::transport::RusbTransport;
use protocol::DeviceInfo;
use rusb::{Context, Device, DeviceDescriptor, DeviceHandle};
use std::fmt;
use tracing::{debug, warn};

/// VID:PID a launcher must carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceFilter {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl DeviceFilter {
    pub fn matches(&self, descriptor: &DeviceDescriptor) -> bool {
        self.matches_ids(descriptor.vendor_id(), descriptor.product_id())
    }

    pub fn matches_ids(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id == vendor_id && self.product_id == product_id
    }
}

impl fmt::Display for DeviceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

/// Why a launcher could not be opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenError {
    /// Device vanished before we got to it
    DeviceNotFound,
    /// No permission on the device node
    PermissionDenied,
    /// Interface held by another process
    Busy,
    Other { message: String },
}

impl fmt::Display for OpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenError::DeviceNotFound => f.write_str("device not found"),
            OpenError::PermissionDenied => {
                f.write_str("permission denied (check udev rules for the device node)")
            }
            OpenError::Busy => f.write_str("interface busy"),
            OpenError::Other { message } => f.write_str(message),
        }
    }
}

impl From<rusb::Error> for OpenError {
    fn from(e: rusb::Error) -> Self {
        match e {
            rusb::Error::NotFound | rusb::Error::NoDevice => OpenError::DeviceNotFound,
            rusb::Error::Access => OpenError::PermissionDenied,
            rusb::Error::Busy => OpenError::Busy,
            _ => OpenError::Other {
                message: e.to_string(),
            },
        }
    }
}

/// Launcher present on the bus
pub struct LauncherDevice {
    device: Device<Context>,
    descriptor: DeviceDescriptor,
}

impl LauncherDevice {
    /// Read and cache the device descriptor
    pub fn new(device: Device<Context>) -> Result<Self, rusb::Error> {
        let descriptor = device.device_descriptor()?;
        Ok(Self { device, descriptor })
    }

    pub fn bus_number(&self) -> u8 {
        self.device.bus_number()
    }

    pub fn device_address(&self) -> u8 {
        self.device.address()
    }

    /// (bus, address) key
    pub fn location(&self) -> (u8, u8) {
        (self.bus_number(), self.device_address())
    }

    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    /// Convert to protocol DeviceInfo
    ///
    /// Reads string descriptors if the device can be opened.
    pub fn device_info(&self, attached: bool) -> DeviceInfo {
        let (manufacturer, product) = self
            .device
            .open()
            .ok()
            .map(|handle| self.read_strings(&handle))
            .unwrap_or((None, None));

        DeviceInfo {
            bus_number: self.bus_number(),
            device_address: self.device_address(),
            vendor_id: self.descriptor.vendor_id(),
            product_id: self.descriptor.product_id(),
            manufacturer,
            product,
            attached,
        }
    }

    /// Open the device and claim `interface` for a session
    ///
    /// The launcher enumerates as a HID device, so usbhid normally owns the
    /// interface; it is detached here and reattached when the transport drops.
    pub fn open(&self, interface: u8) -> Result<RusbTransport, OpenError> {
        let handle = self.device.open().map_err(|e| {
            warn!("Failed to open launcher at {:?}: {}", self.location(), e);
            OpenError::from(e)
        })?;

        let kernel_driver_detached = match handle.kernel_driver_active(interface) {
            Ok(true) => {
                debug!("Detaching kernel driver from interface {}", interface);
                handle.detach_kernel_driver(interface).map_err(|e| {
                    warn!(
                        "Failed to detach kernel driver from interface {}: {}",
                        interface, e
                    );
                    OpenError::from(e)
                })?;
                true
            }
            Ok(false) => false,
            Err(e) => {
                // Not supported on every platform; claiming decides
                debug!(
                    "Could not check kernel driver status for interface {}: {}",
                    interface, e
                );
                false
            }
        };

        if let Err(e) = handle.claim_interface(interface) {
            warn!("Failed to claim interface {}: {}", interface, e);
            if kernel_driver_detached {
                let _ = handle.attach_kernel_driver(interface);
            }
            return Err(OpenError::from(e));
        }

        debug!(
            "Claimed interface {} on launcher at {:?}",
            interface,
            self.location()
        );
        Ok(RusbTransport::new(handle, interface, kernel_driver_detached))
    }

    fn read_strings(&self, handle: &DeviceHandle<Context>) -> (Option<String>, Option<String>) {
        let manufacturer = self
            .descriptor
            .manufacturer_string_index()
            .and_then(|idx| handle.read_string_descriptor_ascii(idx).ok());

        let product = self
            .descriptor
            .product_string_index()
            .and_then(|idx| handle.read_string_descriptor_ascii(idx).ok());

        (manufacturer, product)
    }
}
