use gatekeep_core::{
    Error, Result,
    constants::{ALARM_TICKS, DOOR_MOTION_TICKS, MAX_CONSECUTIVE_FAILURES, NOTICE_TICKS},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ticks the HMI allows for a whole door cycle beyond the Control node's own
/// bound, covering sensor settling and the two tick sources drifting apart.
pub const DOOR_CYCLE_MARGIN_TICKS: u32 = 2;

/// HMI node configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HmiConfig {
    /// Ticks the keypad stays locked after too many failures.
    pub alarm_ticks: u32,

    /// Ticks a transient notice stays on screen.
    pub notice_ticks: u32,

    /// Consecutive failures on one menu path before lockout.
    pub max_failures: u8,

    /// Longest wait for a `CORRECT`/`FAIL` reply.
    pub response_timeout_ms: u64,

    /// Longest wait, from `CORRECT` to `DOOR_CLOSED`, for a door cycle.
    /// Counted in ticks so it scales with the tick interval the same way the
    /// Control node's cycle does. `None` waits forever.
    pub door_cycle_timeout_ticks: Option<u32>,
}

impl Default for HmiConfig {
    fn default() -> Self {
        Self {
            alarm_ticks: ALARM_TICKS,
            notice_ticks: NOTICE_TICKS,
            max_failures: MAX_CONSECUTIVE_FAILURES,
            response_timeout_ms: 10_000,
            // Open, wait for the doorway, close.
            door_cycle_timeout_ticks: Some(
                2 * DOOR_MOTION_TICKS + ALARM_TICKS + DOOR_CYCLE_MARGIN_TICKS,
            ),
        }
    }
}

impl HmiConfig {
    pub fn with_alarm_ticks(mut self, ticks: u32) -> Self {
        self.alarm_ticks = ticks;
        self
    }

    pub fn with_notice_ticks(mut self, ticks: u32) -> Self {
        self.notice_ticks = ticks;
        self
    }

    pub fn with_max_failures(mut self, failures: u8) -> Self {
        self.max_failures = failures;
        self
    }

    pub fn with_response_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.response_timeout_ms = timeout_ms;
        self
    }

    pub fn with_door_cycle_timeout_ticks(mut self, ticks: Option<u32>) -> Self {
        self.door_cycle_timeout_ticks = ticks;
        self
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    /// # Errors
    /// Returns `Error::Config` if `max_failures` is zero or the door cycle
    /// timeout is zero ticks.
    pub fn validate(&self) -> Result<()> {
        if self.max_failures == 0 {
            return Err(Error::Config("max_failures must be at least 1".to_string()));
        }
        if self.door_cycle_timeout_ticks == Some(0) {
            return Err(Error::Config(
                "door_cycle_timeout_ticks must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
