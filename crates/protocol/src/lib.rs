//! Protocol library for the missile launcher
//!
//! This crate defines the device command protocol: the six actuators, the
//! 5-byte command encoding, the control-transfer contract a transport must
//! honour, and the text line protocol used to read and write attributes.
//!
//! # Example
//!
//! ```
//! use protocol::{Actuator, encode};
//!
//! let cmd = encode(Actuator::Left, true);
//! assert_eq!(cmd.as_bytes(), &[0x5f, 0x08, 0xe0, 0xff, 0xfe]);
//!
//! // Turning anything off sends the stop code
//! let cmd = encode(Actuator::Left, false);
//! assert_eq!(cmd.as_bytes(), &[0x5f, 0x00, 0xe0, 0xff, 0xfe]);
//! ```

pub mod actuator;
pub mod command;
pub mod error;
pub mod request;
pub mod transport;
pub mod types;

pub use actuator::Actuator;
pub use command::{COMMAND_LEN, Command, encode};
pub use error::{RequestError, TransportError};
pub use request::{AttributeRequest, AttributeResponse};
pub use transport::{ControlSetup, DEFAULT_TIMEOUT, TransportPort};
pub use types::{DeviceInfo, LAUNCHER_PRODUCT_ID, LAUNCHER_VENDOR_ID};
