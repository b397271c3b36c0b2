//! USB subsystem
//!
//! Launcher discovery, hot-plug handling and the libusb-backed transport.
//!
//! Discovery runs in a dedicated thread (worker) so libusb event handling
//! never blocks the Tokio runtime. The transport it opens is handed to a
//! `DeviceSession` that serves attribute writes directly.

pub mod device;
pub mod manager;
pub mod transport;
pub mod worker;

pub use device::DeviceFilter;
pub use transport::RusbTransport;
pub use worker::{WorkerSettings, spawn_usb_worker};
