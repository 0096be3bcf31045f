//! Common types shared by the peripheral traits.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{HardwareError, Result};

/// One key of the 4×4 calculator-style keypad.
///
/// ```text
/// 7 8 9 /
/// 4 5 6 *
/// 1 2 3 -
/// C 0 = +
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Numeric key 0-9.
    Digit(u8),
    Plus,
    Minus,
    Multiply,
    Divide,
    /// `=`, commits an entry.
    Equals,
    /// `ON/C`.
    Clear,
}

impl Key {
    /// Create a digit key, validating the range.
    ///
    /// # Errors
    /// Returns `HardwareError::InvalidData` if `d > 9`.
    pub fn digit(d: u8) -> Result<Self> {
        if d > 9 {
            return Err(HardwareError::invalid_data(format!(
                "Digit must be 0-9, got {}",
                d
            )));
        }
        Ok(Self::Digit(d))
    }

    /// Map a character printed on the keypad to its key.
    ///
    /// # Examples
    ///
    /// ```
    /// use gatekeep_hardware::Key;
    ///
    /// assert_eq!(Key::from_char('7'), Some(Key::Digit(7)));
    /// assert_eq!(Key::from_char('='), Some(Key::Equals));
    /// assert_eq!(Key::from_char('x'), None);
    /// ```
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0'..='9' => c.to_digit(10).map(|d| Key::Digit(d as u8)),
            '+' => Some(Key::Plus),
            '-' => Some(Key::Minus),
            '*' => Some(Key::Multiply),
            '/' => Some(Key::Divide),
            '=' => Some(Key::Equals),
            'c' | 'C' => Some(Key::Clear),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Key::Digit(d) => char::from(b'0' + d),
            Key::Plus => '+',
            Key::Minus => '-',
            Key::Multiply => '*',
            Key::Divide => '/',
            Key::Equals => '=',
            Key::Clear => 'C',
        }
    }

    pub fn as_digit(&self) -> Option<u8> {
        match self {
            Key::Digit(d) => Some(*d),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Door motor direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotorDirection {
    Stop,
    /// Opens the door.
    Forward,
    /// Closes the door.
    Reverse,
}

impl fmt::Display for MotorDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MotorDirection::Stop => "stop",
            MotorDirection::Forward => "forward",
            MotorDirection::Reverse => "reverse",
        };
        f.write_str(name)
    }
}
