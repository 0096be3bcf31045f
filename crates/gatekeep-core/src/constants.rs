//! Core constants for the gatekeep link protocol.
//!
//! This module defines the protocol-level constants shared by the HMI node and
//! the Control node. Both nodes are built against the same table; changing a
//! value here changes the wire contract for both sides at once.
//!
//! # Wire Format
//!
//! Every exchange is a single command or response byte, optionally followed by
//! a payload whose length is implied by the command code:
//!
//! ```text
//! <CODE>[PAYLOAD...]
//! ```
//!
//! | Byte | Direction    | Name          | Payload   |
//! |------|--------------|---------------|-----------|
//! | 0xA0 | HMI→Control  | `LOAD`        | 10        |
//! | 0xF1 | HMI→Control  | `VERIFY`      | 5         |
//! | 0xE0 | HMI→Control  | `UPDATE`      | 5 then 10 |
//! | 0xF2 | HMI→Control  | `ALARM_ON`    | 0         |
//! | 0xC0 | Control→HMI  | `CORRECT`     | 0         |
//! | 0xF0 | Control→HMI  | `FAIL`        | 0         |
//! | 0xB0 | Control→HMI  | `PEOPLE_IN`   | 0         |
//! | 0xD0 | Control→HMI  | `PEOPLE_NO`   | 0         |
//! | 0xF3 | Control→HMI  | `DOOR_CLOSED` | 0         |
//!
//! There is no length field, checksum, or framing marker.
//!
//! # Usage
//!
//! ```
//! use gatekeep_core::constants::*;
//!
//! assert_eq!(CANDIDATE_LENGTH, 2 * CREDENTIAL_LENGTH);
//! assert_eq!(CODE_VERIFY, 0xF1);
//! ```

// ============================================================================
// Command Codes (HMI → Control)
// ============================================================================

/// Enroll or replace the stored credential. Followed by 10 bytes.
pub const CODE_LOAD: u8 = 0xA0;

/// Request door-open verification. Followed by 5 bytes.
pub const CODE_VERIFY: u8 = 0xF1;

/// Change the stored credential. Followed by a 5-byte probe, then 10 bytes.
pub const CODE_UPDATE: u8 = 0xE0;

/// Force the alarm on for the fixed alarm duration. No payload.
pub const CODE_ALARM_ON: u8 = 0xF2;

// ============================================================================
// Response Codes (Control → HMI)
// ============================================================================

/// Verification or update step succeeded.
pub const CODE_CORRECT: u8 = 0xC0;

/// Verification or update step failed.
pub const CODE_FAIL: u8 = 0xF0;

/// Entry window open, presence sensor armed.
pub const CODE_PEOPLE_IN: u8 = 0xB0;

/// Presence sensor cleared, door closing.
pub const CODE_PEOPLE_NO: u8 = 0xD0;

/// Closing sequence complete.
pub const CODE_DOOR_CLOSED: u8 = 0xF3;

// ============================================================================
// Credential Layout
// ============================================================================

/// Number of bytes in a credential.
pub const CREDENTIAL_LENGTH: usize = 5;

/// Number of bytes in a candidate buffer (entry + confirmation/reference).
pub const CANDIDATE_LENGTH: usize = 2 * CREDENTIAL_LENGTH;

/// Base address of the credential in non-volatile storage.
pub const DEFAULT_STORE_BASE_ADDRESS: u16 = 0x000;

/// Size of the emulated EEPROM image in bytes (ATmega32 class part).
pub const STORE_CAPACITY: usize = 1024;

/// Value of an erased EEPROM cell.
pub const ERASED_BYTE: u8 = 0xFF;

// ============================================================================
// Timing (expressed in ticks unless noted)
// ============================================================================

/// Default interval between two ticks of the tick source, in milliseconds.
///
/// Every duration the protocol expresses in ticks assumes this interval.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 3_000;

/// Ticks the actuator runs in each direction (~15 s at the default interval).
pub const DOOR_MOTION_TICKS: u32 = 5;

/// Ticks the alarm sounds and the HMI stays locked (~60 s).
pub const ALARM_TICKS: u32 = 20;

/// Ticks a transient notice ("Mismatch!!", "Incorrect..") stays on screen.
pub const NOTICE_TICKS: u32 = 1;

/// Consecutive failures that trigger the lockout cooldown.
pub const MAX_CONSECUTIVE_FAILURES: u8 = 3;

/// Actuator speed used for door motion, in percent.
pub const DOOR_MOTOR_SPEED: u8 = 100;

/// Delay between transmitting `PEOPLE_IN` and the first sensor poll, in milliseconds.
pub const SENSOR_SETTLE_MS: u64 = 500;

/// Delay after each EEPROM byte write, in milliseconds.
pub const STORE_WRITE_DELAY_MS: u64 = 10;

// ============================================================================
// HMI Keys
// ============================================================================

/// Key that commits a credential entry.
pub const KEY_ENTER: char = '=';

/// Menu key that opens the door.
pub const KEY_OPEN_DOOR: char = '+';

/// Menu key that starts a credential change.
pub const KEY_CHANGE_CREDENTIAL: char = '-';

/// Character echoed for each credential key.
pub const MASK_CHAR: char = '*';
