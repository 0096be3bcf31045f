//! HMI node of the gatekeep appliance.
//!
//! The HMI collects credentials from the keypad, runs the client side of the
//! link protocol and renders progress on the character display. It never
//! sees the stored credential; every decision comes back from the Control
//! node as `CORRECT` or `FAIL`.
//!
//! # Modules
//!
//! - [`session`]: enrollment and the operating menu
//! - [`lockout`]: consecutive-failure counting per menu path
//! - [`entry`]: masked five-digit keypad entry
//! - [`screen`]: the fixed LCD screens

pub mod config;
pub mod entry;
pub mod error;
pub mod lockout;
pub mod screen;
pub mod session;

pub use config::HmiConfig;
pub use entry::{EntryEvent, MaskedEntry, read_masked};
pub use error::{SessionError, SessionResult};
pub use lockout::{FailureVerdict, LockoutGovernor};
pub use screen::Screen;
pub use session::{MenuChoice, SessionController, SessionOutcome, SessionPhase};
