//! Peripheral abstraction layer for the two gatekeep nodes.
//!
//! The HMI node drives a keypad and a character LCD. The Control node drives
//! the door motor, a presence sensor, a buzzer and an external EEPROM that
//! holds the credential. Each of these is a trait here, so the node state
//! machines can run against mocks, simulations or board drivers alike.
//!
//! # Device Traits
//!
//! | Trait                | Node    | Mock / simulation                         |
//! |----------------------|---------|-------------------------------------------|
//! | [`KeypadDevice`]     | HMI     | [`mock::MockKeypad`]                      |
//! | [`CharacterDisplay`] | HMI     | [`VirtualDisplay`]                        |
//! | [`DoorActuator`]     | Control | [`mock::MockActuator`]                    |
//! | [`PresenceSensor`]   | Control | [`mock::MockSensor`], [`mock::SimulatedSensor`] |
//! | [`AlarmDevice`]      | Control | [`mock::MockAlarm`]                       |
//! | [`CredentialStore`]  | Control | [`MemoryStore`], [`FileStore`]            |
//!
//! The tick source lives in [`timer`].
//!
//! # Example
//!
//! ```no_run
//! use gatekeep_hardware::{Key, KeypadDevice, Result};
//!
//! async fn read_menu_choice<K: KeypadDevice>(keypad: &mut K) -> Result<Key> {
//!     loop {
//!         let key = keypad.read_key().await?;
//!         if matches!(key, Key::Plus | Key::Minus) {
//!             return Ok(key);
//!         }
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! All operations return [`Result<T>`][error::Result] with a
//! [`HardwareError`]. Storage faults are distinguishable through
//! [`HardwareError::is_storage_fault`].

pub mod display;
pub mod error;
pub mod mock;
pub mod store;
pub mod timer;
pub mod traits;
pub mod types;

pub use display::VirtualDisplay;
pub use error::{HardwareError, Result};
pub use store::{FileStore, MemoryStore};
pub use timer::{TickHandler, TickSource, Ticks, TimerConfig, TimerId};
pub use traits::{
    AlarmDevice, CharacterDisplay, CredentialStore, DoorActuator, KeypadDevice, PresenceSensor,
};
pub use types::{Key, MotorDirection};
