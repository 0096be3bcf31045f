//! Consecutive-failure counter for one menu path.
//!
//! Every `FAIL` reply is recorded. When the count reaches the limit the
//! governor answers [`FailureVerdict::Lockout`] and starts over from zero,
//! so the attempt after a lockout begins a fresh count. A `CORRECT` reply
//! resets the count immediately.
//!
//! # Examples
//!
//! ```
//! use gatekeep_hmi::{FailureVerdict, LockoutGovernor};
//!
//! let mut governor = LockoutGovernor::new(3);
//! assert_eq!(governor.record_failure(), FailureVerdict::Retry { failures: 1 });
//! assert_eq!(governor.record_failure(), FailureVerdict::Retry { failures: 2 });
//! assert_eq!(governor.record_failure(), FailureVerdict::Lockout);
//! assert_eq!(governor.failures(), 0);
//! ```

use serde::{Deserialize, Serialize};

/// What to do after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureVerdict {
    /// Below the limit; `failures` consecutive failures so far.
    Retry { failures: u8 },
    /// Limit reached; raise the alarm and cool down.
    Lockout,
}

#[derive(Debug, Clone)]
pub struct LockoutGovernor {
    failures: u8,
    max_failures: u8,
}

impl LockoutGovernor {
    pub fn new(max_failures: u8) -> Self {
        Self {
            failures: 0,
            max_failures: max_failures.max(1),
        }
    }

    pub fn failures(&self) -> u8 {
        self.failures
    }

    pub fn max_failures(&self) -> u8 {
        self.max_failures
    }

    pub fn record_failure(&mut self) -> FailureVerdict {
        self.failures += 1;
        if self.failures >= self.max_failures {
            self.failures = 0;
            return FailureVerdict::Lockout;
        }
        FailureVerdict::Retry {
            failures: self.failures,
        }
    }

    pub fn record_success(&mut self) {
        self.failures = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(5)]
    fn test_lockout_on_limit(#[case] limit: u8) {
        let mut governor = LockoutGovernor::new(limit);
        for n in 1..limit {
            assert_eq!(
                governor.record_failure(),
                FailureVerdict::Retry { failures: n }
            );
        }
        assert_eq!(governor.record_failure(), FailureVerdict::Lockout);
        assert_eq!(governor.failures(), 0);
    }

    #[test]
    fn test_success_resets_count() {
        let mut governor = LockoutGovernor::new(3);
        governor.record_failure();
        governor.record_failure();
        governor.record_success();

        assert_eq!(governor.failures(), 0);
        assert_eq!(
            governor.record_failure(),
            FailureVerdict::Retry { failures: 1 }
        );
    }

    #[test]
    fn test_fourth_failure_starts_fresh_count() {
        let mut governor = LockoutGovernor::new(3);
        for _ in 0..3 {
            governor.record_failure();
        }
        assert_eq!(
            governor.record_failure(),
            FailureVerdict::Retry { failures: 1 }
        );
    }

    #[test]
    fn test_zero_limit_behaves_as_one() {
        let mut governor = LockoutGovernor::new(0);
        assert_eq!(governor.max_failures(), 1);
        assert_eq!(governor.record_failure(), FailureVerdict::Lockout);
    }
}
