//! Peripheral trait definitions.
//!
//! These traits are the seams between the two node state machines and the
//! boards' peripherals. Each has a mock or simulated implementation in this
//! crate; a board support package would provide the real ones.
//!
//! All traits use native `async fn` methods (Edition 2024 RPITIT). They are
//! consumed through generics rather than trait objects.

#![allow(async_fn_in_trait)]

use crate::error::Result;
use crate::types::{Key, MotorDirection};

/// Matrix keypad on the HMI node.
pub trait KeypadDevice: Send {
    /// Wait for the next key press.
    ///
    /// # Errors
    /// Returns `HardwareError::Disconnected` once no more keys can arrive.
    async fn read_key(&mut self) -> Result<Key>;

    /// Drop presses buffered but not yet read, returning how many.
    fn discard_pending(&mut self) -> usize {
        0
    }
}

/// Character LCD on the HMI node.
pub trait CharacterDisplay: Send {
    /// Blank the screen and home the cursor.
    async fn clear(&mut self) -> Result<()>;

    /// Write `text` starting at `row`, `col`. Text past the last column is dropped.
    async fn write_at(&mut self, row: u8, col: u8, text: &str) -> Result<()>;
}

/// DC motor driving the door.
pub trait DoorActuator: Send {
    /// Drive the motor in `direction` at `speed` percent.
    async fn rotate(&mut self, direction: MotorDirection, speed: u8) -> Result<()>;
}

/// PIR presence sensor in the doorway.
pub trait PresenceSensor: Send {
    /// `true` while someone is detected.
    async fn presence(&mut self) -> Result<bool>;
}

/// Buzzer on the Control node.
pub trait AlarmDevice: Send {
    async fn set_active(&mut self, active: bool) -> Result<()>;
}

/// Byte-addressable non-volatile store (external EEPROM).
pub trait CredentialStore: Send {
    /// Read one byte.
    ///
    /// # Errors
    /// Returns `HardwareError::Storage` or `HardwareError::AddressOutOfRange`.
    async fn read(&mut self, address: u16) -> Result<u8>;

    /// Write one byte.
    ///
    /// # Errors
    /// Returns `HardwareError::Storage` or `HardwareError::AddressOutOfRange`.
    async fn write(&mut self, address: u16, byte: u8) -> Result<()>;
}
