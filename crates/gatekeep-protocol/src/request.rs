//! Typed HMI → Control transmissions.
//!
//! A request is written to the link in one piece: the command byte followed
//! by its payload. The second stage of an UPDATE has no command byte of its
//! own; it is the bare 10-byte candidate sent after the probe was accepted.

use bytes::BufMut;
use gatekeep_core::{CandidateBuffer, Credential, constants::CANDIDATE_LENGTH};

use crate::code::{Command, WireCode};

/// A complete HMI → Control transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// `LOAD` followed by entry and confirmation.
    Load(CandidateBuffer),
    /// `VERIFY` followed by the entered credential.
    Verify(Credential),
    /// `UPDATE` followed by the old-credential probe.
    UpdateProbe(Credential),
    /// Second UPDATE stage: new credential and its confirmation, no code byte.
    UpdateReplacement(CandidateBuffer),
    /// `ALARM_ON`, no payload.
    AlarmOn,
}

impl Request {
    /// Command byte that opens this request, if any.
    pub fn command(&self) -> Option<Command> {
        match self {
            Request::Load(_) => Some(Command::Load),
            Request::Verify(_) => Some(Command::Verify),
            Request::UpdateProbe(_) => Some(Command::Update),
            Request::UpdateReplacement(_) => None,
            Request::AlarmOn => Some(Command::AlarmOn),
        }
    }

    /// Number of bytes this request occupies on the wire.
    ///
    /// # Examples
    ///
    /// ```
    /// use gatekeep_core::Credential;
    /// use gatekeep_protocol::Request;
    ///
    /// let request = Request::Verify(Credential::new([1, 2, 3, 4, 5]));
    /// assert_eq!(request.encoded_len(), 6);
    /// assert_eq!(Request::AlarmOn.encoded_len(), 1);
    /// ```
    pub fn encoded_len(&self) -> usize {
        match self.command() {
            Some(command) => 1 + command.payload_len(),
            None => CANDIDATE_LENGTH,
        }
    }

    /// Write the request bytes to `dst`.
    pub fn encode<B: BufMut>(&self, dst: &mut B) {
        if let Some(command) = self.command() {
            dst.put_u8(command.to_byte());
        }
        match self {
            Request::Load(buffer) | Request::UpdateReplacement(buffer) => {
                dst.put_slice(buffer.as_bytes())
            }
            Request::Verify(credential) | Request::UpdateProbe(credential) => {
                dst.put_slice(credential.as_bytes())
            }
            Request::AlarmOn => {}
        }
    }
}
