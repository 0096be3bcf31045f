use crate::{
    Result,
    constants::{CANDIDATE_LENGTH, CREDENTIAL_LENGTH},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// The 5-byte secret gating door access.
///
/// # Security
/// Comparison is constant-time and the `Debug` output is redacted, so a
/// credential never ends up in a log line.
#[derive(Clone, Copy, Eq)]
pub struct Credential([u8; CREDENTIAL_LENGTH]);

impl Credential {
    /// Create a credential from its raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; CREDENTIAL_LENGTH]) -> Self {
        Credential(bytes)
    }

    /// Create a credential from a slice.
    ///
    /// # Errors
    /// Returns `Error::InvalidCredential` if the slice is not exactly 5 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; CREDENTIAL_LENGTH] = bytes.try_into().map_err(|_| {
            Error::InvalidCredential(format!(
                "Credential must be {CREDENTIAL_LENGTH} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Credential(array))
    }

    /// Parse a credential from a string of 5 decimal digits.
    ///
    /// Each digit becomes one byte holding its numeric value, which is how the
    /// keypad reports digit keys.
    ///
    /// # Errors
    /// Returns `Error::InvalidCredential` if the string is not exactly 5 ASCII digits.
    ///
    /// # Examples
    ///
    /// ```
    /// use gatekeep_core::Credential;
    ///
    /// let credential = Credential::from_digits("12345").unwrap();
    /// assert_eq!(credential.as_bytes(), &[1, 2, 3, 4, 5]);
    ///
    /// assert!(Credential::from_digits("1234").is_err());
    /// assert!(Credential::from_digits("12a45").is_err());
    /// ```
    pub fn from_digits(digits: &str) -> Result<Self> {
        let bytes = digits
            .chars()
            .map(|c| {
                c.to_digit(10).map(|d| d as u8).ok_or_else(|| {
                    Error::InvalidCredential(format!("Credential digits must be 0-9, got '{c}'"))
                })
            })
            .collect::<Result<Vec<u8>>>()?;
        Self::from_slice(&bytes)
    }

    /// Get the raw credential bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; CREDENTIAL_LENGTH] {
        &self.0
    }
}

/// Constant-time comparison for Credential
impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(*****)")
    }
}

impl From<[u8; CREDENTIAL_LENGTH]> for Credential {
    fn from(bytes: [u8; CREDENTIAL_LENGTH]) -> Self {
        Credential(bytes)
    }
}

/// Transient 10-byte comparison buffer.
///
/// Bytes 0-4 hold the entered (or new) value. Bytes 5-9 hold either the
/// confirmation copy (load path) or the value read back from storage (verify
/// path). The two halves are only ever compared against each other.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CandidateBuffer([u8; CANDIDATE_LENGTH]);

impl CandidateBuffer {
    /// Build a buffer from an entry and its confirmation copy.
    #[must_use]
    pub fn from_entry_and_confirmation(entry: Credential, confirmation: Credential) -> Self {
        Self::from_halves(entry, confirmation)
    }

    /// Build a buffer from an entered candidate and the stored reference value.
    #[must_use]
    pub fn from_entry_and_reference(entry: Credential, reference: Credential) -> Self {
        Self::from_halves(entry, reference)
    }

    /// Build a buffer from 10 raw bytes as received on the link.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; CANDIDATE_LENGTH]) -> Self {
        CandidateBuffer(bytes)
    }

    /// Build a buffer from a slice of raw bytes.
    ///
    /// # Errors
    /// Returns `Error::InvalidCredential` if the slice is not exactly 10 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; CANDIDATE_LENGTH] = bytes.try_into().map_err(|_| {
            Error::InvalidCredential(format!(
                "Candidate buffer must be {CANDIDATE_LENGTH} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(CandidateBuffer(array))
    }

    fn from_halves(first: Credential, second: Credential) -> Self {
        let mut bytes = [0u8; CANDIDATE_LENGTH];
        bytes[..CREDENTIAL_LENGTH].copy_from_slice(first.as_bytes());
        bytes[CREDENTIAL_LENGTH..].copy_from_slice(second.as_bytes());
        CandidateBuffer(bytes)
    }

    /// The entered (or new) half, bytes 0-4.
    #[must_use]
    pub fn entered(&self) -> Credential {
        let mut half = [0u8; CREDENTIAL_LENGTH];
        half.copy_from_slice(&self.0[..CREDENTIAL_LENGTH]);
        Credential(half)
    }

    /// The confirmation or reference half, bytes 5-9.
    #[must_use]
    pub fn counterpart(&self) -> Credential {
        let mut half = [0u8; CREDENTIAL_LENGTH];
        half.copy_from_slice(&self.0[CREDENTIAL_LENGTH..]);
        Credential(half)
    }

    /// Compare the two halves.
    #[must_use]
    pub fn halves_match(&self) -> bool {
        self.entered() == self.counterpart()
    }

    /// Get the raw buffer bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; CANDIDATE_LENGTH] {
        &self.0
    }
}

impl fmt::Debug for CandidateBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CandidateBuffer(**********)")
    }
}

/// Outcome of comparing a candidate against its counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verification {
    /// All five byte pairs matched.
    Match,
    /// At least one byte pair differed.
    Mismatch,
}

impl Verification {
    #[must_use]
    pub fn is_match(&self) -> bool {
        matches!(self, Verification::Match)
    }
}

impl From<&CandidateBuffer> for Verification {
    fn from(buffer: &CandidateBuffer) -> Self {
        if buffer.halves_match() {
            Verification::Match
        } else {
            Verification::Mismatch
        }
    }
}

/// Value of the monotonically increasing tick counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct TickCount(u64);

impl TickCount {
    pub const ZERO: TickCount = TickCount(0);

    #[must_use]
    pub const fn new(count: u64) -> Self {
        TickCount(count)
    }

    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// The count one tick later.
    #[must_use]
    pub fn next(&self) -> Self {
        TickCount(self.0.saturating_add(1))
    }
}

impl fmt::Display for TickCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tick count at which a wait ends.
///
/// Created when a wait begins, consumed when the counter reaches it.
///
/// # Examples
///
/// ```
/// use gatekeep_core::{TickCount, TimeoutDeadline};
///
/// let deadline = TimeoutDeadline::after(TickCount::new(7), 5);
/// assert!(!deadline.is_reached(TickCount::new(11)));
/// assert!(deadline.is_reached(TickCount::new(12)));
/// assert_eq!(deadline.remaining(TickCount::new(10)), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutDeadline {
    due: TickCount,
}

impl TimeoutDeadline {
    /// Deadline `ticks` ticks after `now`.
    #[must_use]
    pub fn after(now: TickCount, ticks: u32) -> Self {
        Self {
            due: TickCount(now.0.saturating_add(u64::from(ticks))),
        }
    }

    #[must_use]
    pub fn due(&self) -> TickCount {
        self.due
    }

    #[must_use]
    pub fn is_reached(&self, now: TickCount) -> bool {
        now >= self.due
    }

    /// Ticks still to elapse before the deadline, zero once reached.
    #[must_use]
    pub fn remaining(&self, now: TickCount) -> u64 {
        self.due.0.saturating_sub(now.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[test]
    fn test_credential_from_slice_rejects_wrong_length() {
        assert!(Credential::from_slice(&[1, 2, 3, 4]).is_err());
        assert!(Credential::from_slice(&[1, 2, 3, 4, 5, 6]).is_err());
        assert!(Credential::from_slice(&[1, 2, 3, 4, 5]).is_ok());
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::new([1, 2, 3, 4, 5]);
        let rendered = format!("{:?}", credential);
        assert_eq!(rendered, "Credential(*****)");
        assert!(!rendered.contains('1'));
    }

    #[rstest]
    #[case([1, 2, 3, 4, 5], [1, 2, 3, 4, 5], true)]
    #[case([1, 2, 3, 4, 5], [9, 9, 9, 9, 9], false)]
    #[case([1, 2, 3, 4, 5], [1, 2, 3, 4, 6], false)]
    #[case([0, 2, 3, 4, 5], [1, 2, 3, 4, 5], false)]
    fn test_candidate_halves_match(
        #[case] entry: [u8; 5],
        #[case] confirmation: [u8; 5],
        #[case] expected: bool,
    ) {
        let buffer = CandidateBuffer::from_entry_and_confirmation(entry.into(), confirmation.into());
        assert_eq!(buffer.halves_match(), expected);
        assert_eq!(Verification::from(&buffer).is_match(), expected);
    }

    #[test]
    fn test_candidate_layout() {
        let buffer = CandidateBuffer::from_bytes([1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(buffer.entered().as_bytes(), &[1, 2, 3, 4, 5]);
        assert_eq!(buffer.counterpart().as_bytes(), &[6, 7, 8, 9, 10]);
    }

    #[test]
    fn test_candidate_from_slice_rejects_short_input() {
        assert!(CandidateBuffer::from_slice(&[0; 9]).is_err());
        assert!(CandidateBuffer::from_slice(&[0; 10]).is_ok());
    }

    #[test]
    fn test_verification_serialization() {
        let json = serde_json::to_string(&Verification::Mismatch).unwrap();
        assert_eq!(json, "\"mismatch\"");
    }

    #[test]
    fn test_deadline_saturates() {
        let deadline = TimeoutDeadline::after(TickCount::new(u64::MAX - 1), 20);
        assert_eq!(deadline.due(), TickCount::new(u64::MAX));
    }

    #[test]
    fn test_deadline_zero_ticks_is_already_reached() {
        let now = TickCount::new(3);
        assert!(TimeoutDeadline::after(now, 0).is_reached(now));
    }

    proptest! {
        #[test]
        fn prop_credential_equality_matches_bytes(a in any::<[u8; 5]>(), b in any::<[u8; 5]>()) {
            prop_assert_eq!(Credential::new(a) == Credential::new(b), a == b);
        }
    }
}
