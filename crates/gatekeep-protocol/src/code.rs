//! Command and response codes exchanged between the two nodes.
//!
//! Every code is a single byte. Commands travel HMI → Control, responses
//! travel Control → HMI. The payload that follows a command is implied by the
//! code alone; responses never carry a payload.
//!
//! # Examples
//!
//! ```
//! use gatekeep_protocol::{Command, Response, WireCode};
//!
//! let cmd = Command::try_from(0xF1).unwrap();
//! assert_eq!(cmd, Command::Verify);
//! assert_eq!(cmd.payload_len(), 5);
//!
//! assert_eq!(Response::DoorClosed.to_byte(), 0xF3);
//! assert!(Response::try_from(0xA0).is_err());
//! ```

use gatekeep_core::{
    Error, Result,
    constants::{
        CANDIDATE_LENGTH, CODE_ALARM_ON, CODE_CORRECT, CODE_DOOR_CLOSED, CODE_FAIL, CODE_LOAD,
        CODE_PEOPLE_IN, CODE_PEOPLE_NO, CODE_UPDATE, CODE_VERIFY, CREDENTIAL_LENGTH,
    },
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A closed set of single-byte codes.
///
/// Implemented by [`Command`] and [`Response`] so the codec can decode either
/// direction of the link.
pub trait WireCode: Copy + fmt::Debug + Send + Sync + 'static {
    /// Human-readable name of the code family, used in log lines.
    const KIND: &'static str;

    fn to_byte(self) -> u8;

    /// Returns `None` for bytes outside the table.
    fn from_byte(byte: u8) -> Option<Self>;
}

/// Commands sent by the HMI node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    /// Enroll or replace the credential (10-byte payload).
    Load,
    /// Verify a credential and open the door (5-byte payload).
    Verify,
    /// Change the credential (5-byte probe, then 10 bytes).
    Update,
    /// Sound the alarm for the fixed alarm duration.
    AlarmOn,
}

impl Command {
    /// Length of the payload that immediately follows the command byte.
    ///
    /// For [`Command::Update`] this is the probe only; the 10-byte replacement
    /// follows after the Control node has answered the probe.
    pub fn payload_len(&self) -> usize {
        match self {
            Command::Load => CANDIDATE_LENGTH,
            Command::Verify | Command::Update => CREDENTIAL_LENGTH,
            Command::AlarmOn => 0,
        }
    }
}

impl WireCode for Command {
    const KIND: &'static str = "command";

    fn to_byte(self) -> u8 {
        match self {
            Command::Load => CODE_LOAD,
            Command::Verify => CODE_VERIFY,
            Command::Update => CODE_UPDATE,
            Command::AlarmOn => CODE_ALARM_ON,
        }
    }

    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            CODE_LOAD => Some(Command::Load),
            CODE_VERIFY => Some(Command::Verify),
            CODE_UPDATE => Some(Command::Update),
            CODE_ALARM_ON => Some(Command::AlarmOn),
            _ => None,
        }
    }
}

impl TryFrom<u8> for Command {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self> {
        Command::from_byte(byte).ok_or(Error::UnrecognizedCommand(byte))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::Load => "LOAD",
            Command::Verify => "VERIFY",
            Command::Update => "UPDATE",
            Command::AlarmOn => "ALARM_ON",
        };
        f.write_str(name)
    }
}

/// Responses sent by the Control node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Response {
    Correct,
    Fail,
    PeopleIn,
    PeopleNo,
    DoorClosed,
}

impl Response {
    /// Expect this exact response.
    ///
    /// # Errors
    /// Returns `Error::UnexpectedResponse` naming both codes when `actual` differs.
    pub fn expect(self, actual: Response) -> Result<()> {
        if self == actual {
            Ok(())
        } else {
            Err(Error::UnexpectedResponse {
                expected: self.to_string(),
                actual: actual.to_string(),
            })
        }
    }
}

impl WireCode for Response {
    const KIND: &'static str = "response";

    fn to_byte(self) -> u8 {
        match self {
            Response::Correct => CODE_CORRECT,
            Response::Fail => CODE_FAIL,
            Response::PeopleIn => CODE_PEOPLE_IN,
            Response::PeopleNo => CODE_PEOPLE_NO,
            Response::DoorClosed => CODE_DOOR_CLOSED,
        }
    }

    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            CODE_CORRECT => Some(Response::Correct),
            CODE_FAIL => Some(Response::Fail),
            CODE_PEOPLE_IN => Some(Response::PeopleIn),
            CODE_PEOPLE_NO => Some(Response::PeopleNo),
            CODE_DOOR_CLOSED => Some(Response::DoorClosed),
            _ => None,
        }
    }
}

impl TryFrom<u8> for Response {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self> {
        Response::from_byte(byte).ok_or(Error::UnrecognizedResponse(byte))
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Response::Correct => "CORRECT",
            Response::Fail => "FAIL",
            Response::PeopleIn => "PEOPLE_IN",
            Response::PeopleNo => "PEOPLE_NO",
            Response::DoorClosed => "DOOR_CLOSED",
        };
        f.write_str(name)
    }
}
