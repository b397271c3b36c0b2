//! Launcher actuators
//!
//! The launcher has six actuators: four directions, fire and stop. Each one
//! carries the direction code the firmware expects in byte 1 of a command.

use crate::error::RequestError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single launcher actuator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Actuator {
    Left,
    Right,
    Up,
    Down,
    Fire,
    Stop,
}

impl Actuator {
    /// All actuators, in attribute-table order
    pub const ALL: [Actuator; 6] = [
        Actuator::Left,
        Actuator::Right,
        Actuator::Up,
        Actuator::Down,
        Actuator::Fire,
        Actuator::Stop,
    ];

    /// Direction code sent in byte 1 of an activating command
    pub const fn code(self) -> u8 {
        match self {
            Actuator::Left => 0x08,
            Actuator::Right => 0x04,
            Actuator::Up => 0x02,
            Actuator::Down => 0x01,
            Actuator::Fire => 0x10,
            Actuator::Stop => 0x00,
        }
    }

    /// Attribute name
    pub const fn name(self) -> &'static str {
        match self {
            Actuator::Left => "left",
            Actuator::Right => "right",
            Actuator::Up => "up",
            Actuator::Down => "down",
            Actuator::Fire => "fire",
            Actuator::Stop => "stop",
        }
    }

    /// Dense index into per-actuator tables
    pub const fn index(self) -> usize {
        match self {
            Actuator::Left => 0,
            Actuator::Right => 1,
            Actuator::Up => 2,
            Actuator::Down => 3,
            Actuator::Fire => 4,
            Actuator::Stop => 5,
        }
    }

    /// Whether this is one of the four movement directions
    pub const fn is_direction(self) -> bool {
        matches!(
            self,
            Actuator::Left | Actuator::Right | Actuator::Up | Actuator::Down
        )
    }
}

impl fmt::Display for Actuator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Actuator {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Actuator::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| RequestError::UnknownAttribute(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_codes() {
        assert_eq!(Actuator::Left.code(), 0x8);
        assert_eq!(Actuator::Right.code(), 0x4);
        assert_eq!(Actuator::Up.code(), 0x2);
        assert_eq!(Actuator::Down.code(), 0x1);
        assert_eq!(Actuator::Fire.code(), 0x10);
        assert_eq!(Actuator::Stop.code(), 0x0);
    }

    #[test]
    fn test_index_is_dense() {
        for (i, actuator) in Actuator::ALL.iter().enumerate() {
            assert_eq!(actuator.index(), i);
        }
    }

    #[test]
    fn test_name_parse() {
        for actuator in Actuator::ALL {
            assert_eq!(actuator.name().parse::<Actuator>().unwrap(), actuator);
        }
        assert!("LEFT".parse::<Actuator>().is_err());
        assert!("sideways".parse::<Actuator>().is_err());
    }

    #[test]
    fn test_is_direction() {
        assert!(Actuator::Up.is_direction());
        assert!(!Actuator::Fire.is_direction());
        assert!(!Actuator::Stop.is_direction());
    }
}
