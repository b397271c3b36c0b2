//! Transport port contract
//!
//! The session hands encoded commands to a [`TransportPort`]; it does not care
//! how they reach the device. The real implementation issues a HID
//! SET_REPORT control transfer; tests substitute a recording mock.

use crate::command::Command;
use crate::error::TransportError;
use std::time::Duration;

/// Default timeout for a single control message
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

/// Control-transfer setup packet used for every launcher command
///
/// The launcher is a HID device that takes its commands as feature reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlSetup {
    /// bmRequestType
    pub request_type: u8,
    /// bRequest
    pub request: u8,
    /// wValue
    pub value: u16,
    /// wIndex
    pub index: u16,
}

impl ControlSetup {
    /// HID class request, interface recipient, host-to-device; SET_REPORT
    /// with report type 3 (feature) in the high byte of wValue.
    pub const LAUNCHER: ControlSetup = ControlSetup {
        request_type: 0x21,
        request: 0x09,
        value: 0x0300,
        index: 0x00,
    };
}

/// Sends one command to the physical device
///
/// Implementations block for at most `timeout`. Failures are reported, never
/// retried.
pub trait TransportPort: Send {
    fn send_control_message(
        &mut self,
        command: &Command,
        timeout: Duration,
    ) -> Result<(), TransportError>;
}

impl<T: TransportPort + ?Sized> TransportPort for Box<T> {
    fn send_control_message(
        &mut self,
        command: &Command,
        timeout: Duration,
    ) -> Result<(), TransportError> {
        (**self).send_control_message(command, timeout)
    }
}
