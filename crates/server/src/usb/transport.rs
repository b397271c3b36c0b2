//! rusb-backed transport
//!
//! Sends launcher commands as HID SET_REPORT control transfers on the claimed
//! interface, and gives the interface back to the kernel when dropped.

use protocol::{COMMAND_LEN, Command, ControlSetup, TransportError, TransportPort};
use rusb::{Context, DeviceHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// Open, claimed launcher interface
///
/// Owned by exactly one `DeviceSession`; dropping it is the "release" step of
/// session teardown.
pub struct RusbTransport {
    handle: DeviceHandle<Context>,
    interface: u8,
    /// Whether we took the interface away from a kernel driver
    kernel_driver_detached: bool,
    setup: ControlSetup,
}

impl RusbTransport {
    /// Wrap a handle whose `interface` is already claimed
    pub(crate) fn new(
        handle: DeviceHandle<Context>,
        interface: u8,
        kernel_driver_detached: bool,
    ) -> Self {
        Self {
            handle,
            interface,
            kernel_driver_detached,
            setup: ControlSetup {
                index: u16::from(interface),
                ..ControlSetup::LAUNCHER
            },
        }
    }
}

impl TransportPort for RusbTransport {
    fn send_control_message(
        &mut self,
        command: &Command,
        timeout: Duration,
    ) -> Result<(), TransportError> {
        let setup = self.setup;
        debug!(
            "Control transfer: request_type={:#x}, request={:#x}, value={:#x}, index={:#x}, data=[{}]",
            setup.request_type, setup.request, setup.value, setup.index, command
        );

        match self.handle.write_control(
            setup.request_type,
            setup.request,
            setup.value,
            setup.index,
            command.as_bytes(),
            timeout,
        ) {
            Ok(written) if written == COMMAND_LEN => Ok(()),
            Ok(written) => Err(TransportError::ShortWrite {
                written,
                expected: COMMAND_LEN,
            }),
            Err(e) => Err(map_rusb_error(e)),
        }
    }
}

impl Drop for RusbTransport {
    fn drop(&mut self) {
        if let Err(e) = self.handle.release_interface(self.interface) {
            // Expected when the device is already gone
            debug!("Failed to release interface {}: {}", self.interface, e);
        }

        if self.kernel_driver_detached {
            match self.handle.attach_kernel_driver(self.interface) {
                Ok(()) => debug!("Reattached kernel driver to interface {}", self.interface),
                Err(rusb::Error::NoDevice) => {}
                Err(e) => warn!(
                    "Could not reattach kernel driver to interface {}: {}",
                    self.interface, e
                ),
            }
        }

        debug!("Released launcher interface {}", self.interface);
    }
}

/// Map rusb::Error to TransportError
pub fn map_rusb_error(err: rusb::Error) -> TransportError {
    match err {
        rusb::Error::Timeout => TransportError::Timeout,
        rusb::Error::Pipe => TransportError::Pipe,
        rusb::Error::NoDevice => TransportError::NoDevice,
        rusb::Error::NotFound => TransportError::NotFound,
        rusb::Error::Busy => TransportError::Busy,
        rusb::Error::Overflow => TransportError::Overflow,
        rusb::Error::Io => TransportError::Io,
        rusb::Error::InvalidParam => TransportError::InvalidParam,
        rusb::Error::Access => TransportError::Access,
        _ => TransportError::Other {
            message: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_rusb_error() {
        assert_eq!(map_rusb_error(rusb::Error::Timeout), TransportError::Timeout);
        assert_eq!(map_rusb_error(rusb::Error::Pipe), TransportError::Pipe);
        assert_eq!(map_rusb_error(rusb::Error::NoDevice), TransportError::NoDevice);
        assert_eq!(map_rusb_error(rusb::Error::Access), TransportError::Access);
        assert!(matches!(
            map_rusb_error(rusb::Error::NotSupported),
            TransportError::Other { .. }
        ));
    }
}
