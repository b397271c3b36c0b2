//! Command encoding
//!
//! Every launcher command is a 5-byte HID feature report of the form
//! `[0x5f, code, 0xe0, 0xff, 0xfe]`. Only byte 1 varies.

use crate::actuator::Actuator;
use std::fmt;

/// Length of every command payload
pub const COMMAND_LEN: usize = 5;

const PREFIX: u8 = 0x5f;
const SUFFIX: [u8; 3] = [0xe0, 0xff, 0xfe];

/// An encoded launcher command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Command([u8; COMMAND_LEN]);

impl Command {
    /// Build the command for driving `actuator` on or off
    ///
    /// Turning any actuator off sends the stop code.
    pub const fn encode(actuator: Actuator, turn_on: bool) -> Self {
        let code = if turn_on {
            actuator.code()
        } else {
            Actuator::Stop.code()
        };
        Command([PREFIX, code, SUFFIX[0], SUFFIX[1], SUFFIX[2]])
    }

    /// Direction code carried by this command
    pub const fn code(&self) -> u8 {
        self.0[1]
    }

    pub const fn as_bytes(&self) -> &[u8; COMMAND_LEN] {
        &self.0
    }

    /// Whether this command is the stop command
    pub const fn is_stop(&self) -> bool {
        self.0[1] == Actuator::Stop.code()
    }
}

impl AsRef<[u8]> for Command {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Shorthand for [`Command::encode`]
pub const fn encode(actuator: Actuator, turn_on: bool) -> Command {
    Command::encode(actuator, turn_on)
}
