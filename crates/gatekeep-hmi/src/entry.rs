//! Masked credential entry from the keypad.
//!
//! Five digit keys make a credential; each echoes `*`. The entry is
//! committed with `=`. Keys other than digits are ignored while the five
//! digits are collected, and any key other than `=` is ignored afterwards.

use gatekeep_core::{
    Credential,
    constants::{CREDENTIAL_LENGTH, MASK_CHAR},
};
use gatekeep_hardware::{CharacterDisplay, Key, KeypadDevice};
use tracing::trace;

use crate::error::SessionResult;

/// Effect of one key press on a [`MaskedEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryEvent {
    /// A digit was accepted at this position; echo a mask character there.
    Masked(usize),
    /// The key has no effect.
    Ignored,
    /// `=` after five digits.
    Complete(Credential),
}

#[derive(Debug, Default, Clone)]
pub struct MaskedEntry {
    digits: [u8; CREDENTIAL_LENGTH],
    len: usize,
}

impl MaskedEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == CREDENTIAL_LENGTH
    }

    pub fn push(&mut self, key: Key) -> EntryEvent {
        match (key, self.is_full()) {
            (Key::Digit(d), false) => {
                let position = self.len;
                self.digits[position] = d;
                self.len += 1;
                EntryEvent::Masked(position)
            }
            (Key::Equals, true) => EntryEvent::Complete(Credential::new(self.digits)),
            _ => EntryEvent::Ignored,
        }
    }
}

/// Read one credential, echoing masks from `(row, col)`.
pub async fn read_masked<K, D>(
    keypad: &mut K,
    display: &mut D,
    (row, col): (u8, u8),
) -> SessionResult<Credential>
where
    K: KeypadDevice,
    D: CharacterDisplay,
{
    let mut entry = MaskedEntry::new();
    let mask = MASK_CHAR.to_string();
    loop {
        let key = keypad.read_key().await?;
        match entry.push(key) {
            EntryEvent::Masked(position) => {
                display.write_at(row, col + position as u8, &mask).await?;
            }
            EntryEvent::Complete(credential) => return Ok(credential),
            EntryEvent::Ignored => trace!(key = %key, "Key ignored during entry"),
        }
    }
}
