//! Control node of the gatekeep appliance.
//!
//! The Control node is the sole owner of the stored credential, the door
//! motor and the alarm. It serves the HMI node over a [`ControlLink`]:
//!
//! - [`ProtocolMachine`] interprets command bytes and runs each exchange
//! - [`DoorSequencer`] opens the door, waits for the doorway to clear and
//!   closes it again after a granted VERIFY
//! - [`CredentialVault`] reads and replaces the credential in the
//!   [`CredentialStore`](gatekeep_hardware::CredentialStore)
//!
//! # Example
//!
//! ```no_run
//! use gatekeep_control::{ControlConfig, ControlPeripherals, ProtocolMachine};
//! use gatekeep_hardware::{
//!     MemoryStore, TimerConfig,
//!     mock::{MockActuator, MockAlarm, MockSensor},
//!     timer::spawn_tick_counter,
//! };
//! use gatekeep_link::duplex_pair;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let (_hmi, control) = duplex_pair(64);
//! let (ticks, _tick_source) = spawn_tick_counter(&TimerConfig::default())?;
//! let (actuator, _) = MockActuator::new();
//! let (sensor, _) = MockSensor::new(false);
//! let (alarm, _) = MockAlarm::new();
//!
//! let peripherals = ControlPeripherals {
//!     store: MemoryStore::new(),
//!     actuator,
//!     sensor,
//!     alarm,
//! };
//! let mut machine = ProtocolMachine::new(control, peripherals, ticks, ControlConfig::default())?;
//! machine.run().await?;
//! # Ok(())
//! # }
//! ```
//!
//! [`ControlLink`]: gatekeep_link::ControlLink

pub mod config;
pub mod error;
pub mod machine;
pub mod sequencer;
pub mod vault;

pub use config::ControlConfig;
pub use error::{ControlError, ControlResult};
pub use machine::{ControlPeripherals, ControlState, ProtocolMachine, StepOutcome};
pub use sequencer::{DoorCycleReport, DoorPhase, DoorSequencer, PhaseTransition};
pub use vault::CredentialVault;
