//! Common utilities for the missile launcher
//!
//! This crate holds the concurrency-safe device-state manager shared by the
//! daemon and its tests: the per-attachment [`DeviceSession`], the
//! [`AttributeBridge`] that exposes it by attribute name, the async channel
//! bridge to the USB thread, error handling and logging setup.

pub mod attributes;
pub mod channel;
pub mod error;
pub mod logging;
pub mod paths;
pub mod session;
pub mod test_utils;

pub use attributes::{AttributeBridge, BridgeError, UnrecognizedInput, parse_flag, render_flag};
pub use channel::{LauncherCommand, LauncherEvent, UsbBridge, UsbWorker, create_usb_bridge};
pub use error::{Error, Result};
pub use logging::{LogStyle, setup_logging, setup_logging_with};
pub use paths::default_socket_path;
pub use session::{
    ActuatorState, CommitPolicy, DeviceSession, SessionError, SessionOptions, SessionPhase,
};
