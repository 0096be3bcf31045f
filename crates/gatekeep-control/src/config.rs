use gatekeep_core::{
    Error, Result,
    constants::{
        ALARM_TICKS, CREDENTIAL_LENGTH, DEFAULT_STORE_BASE_ADDRESS, DOOR_MOTION_TICKS,
        DOOR_MOTOR_SPEED, SENSOR_SETTLE_MS, STORE_CAPACITY, STORE_WRITE_DELAY_MS,
    },
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Control node configuration.
///
/// Tick-denominated fields assume the tick interval configured on the
/// node's [`TimerConfig`](gatekeep_hardware::TimerConfig).
///
/// # Example
///
/// ```
/// use gatekeep_control::ControlConfig;
///
/// let config = ControlConfig::default()
///     .with_entry_timeout_ticks(None)
///     .with_door_motion_ticks(2);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// EEPROM address of the first credential byte.
    pub store_base_address: u16,

    /// Door motor speed in percent.
    pub motor_speed: u8,

    /// Ticks the motor runs to open, and again to close.
    pub door_motion_ticks: u32,

    /// Ticks the alarm sounds after `ALARM_ON`.
    pub alarm_ticks: u32,

    /// Delay between sending `PEOPLE_IN` and the first sensor read.
    pub sensor_settle_ms: u64,

    /// Delay between two sensor reads.
    pub sensor_poll_interval_ms: u64,

    /// Longest wait for the doorway to clear. `None` waits forever.
    pub entry_timeout_ticks: Option<u32>,

    /// Longest gap between a command byte and the end of its payload.
    pub payload_timeout_ms: u64,

    /// Longest wait for the new credential after an accepted UPDATE probe.
    /// `None` waits forever.
    pub update_entry_timeout_ms: Option<u64>,

    /// Pause after each EEPROM byte write.
    pub store_write_delay_ms: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            store_base_address: DEFAULT_STORE_BASE_ADDRESS,
            motor_speed: DOOR_MOTOR_SPEED,
            door_motion_ticks: DOOR_MOTION_TICKS,
            alarm_ticks: ALARM_TICKS,
            sensor_settle_ms: SENSOR_SETTLE_MS,
            sensor_poll_interval_ms: 50,
            entry_timeout_ticks: Some(ALARM_TICKS),
            payload_timeout_ms: 2000,
            update_entry_timeout_ms: Some(120_000),
            store_write_delay_ms: STORE_WRITE_DELAY_MS,
        }
    }
}

impl ControlConfig {
    pub fn with_store_base_address(mut self, address: u16) -> Self {
        self.store_base_address = address;
        self
    }

    pub fn with_motor_speed(mut self, speed: u8) -> Self {
        self.motor_speed = speed;
        self
    }

    pub fn with_door_motion_ticks(mut self, ticks: u32) -> Self {
        self.door_motion_ticks = ticks;
        self
    }

    pub fn with_alarm_ticks(mut self, ticks: u32) -> Self {
        self.alarm_ticks = ticks;
        self
    }

    pub fn with_entry_timeout_ticks(mut self, ticks: Option<u32>) -> Self {
        self.entry_timeout_ticks = ticks;
        self
    }

    pub fn with_payload_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.payload_timeout_ms = timeout_ms;
        self
    }

    pub fn with_update_entry_timeout_ms(mut self, timeout_ms: Option<u64>) -> Self {
        self.update_entry_timeout_ms = timeout_ms;
        self
    }

    pub fn with_store_write_delay_ms(mut self, delay_ms: u64) -> Self {
        self.store_write_delay_ms = delay_ms;
        self
    }

    pub fn sensor_settle(&self) -> Duration {
        Duration::from_millis(self.sensor_settle_ms)
    }

    pub fn sensor_poll_interval(&self) -> Duration {
        Duration::from_millis(self.sensor_poll_interval_ms)
    }

    pub fn payload_timeout(&self) -> Duration {
        Duration::from_millis(self.payload_timeout_ms)
    }

    pub fn update_entry_timeout(&self) -> Option<Duration> {
        self.update_entry_timeout_ms.map(Duration::from_millis)
    }

    pub fn store_write_delay(&self) -> Duration {
        Duration::from_millis(self.store_write_delay_ms)
    }

    /// Upper bound, in ticks, on a door cycle from `CORRECT` to
    /// `DOOR_CLOSED`. `None` when the entry wait is unbounded.
    pub fn door_cycle_ticks(&self) -> Option<u32> {
        self.entry_timeout_ticks.map(|entry| {
            self.door_motion_ticks
                .saturating_mul(2)
                .saturating_add(entry)
        })
    }

    /// Check the values against the hardware limits.
    ///
    /// # Errors
    /// Returns `Error::Config` describing the first offending field.
    pub fn validate(&self) -> Result<()> {
        if usize::from(self.store_base_address) + CREDENTIAL_LENGTH > STORE_CAPACITY {
            return Err(Error::Config(format!(
                "store_base_address 0x{:03X} leaves no room for a {}-byte credential",
                self.store_base_address, CREDENTIAL_LENGTH
            )));
        }
        if self.motor_speed > 100 {
            return Err(Error::Config(format!(
                "motor_speed must be 0-100, got {}",
                self.motor_speed
            )));
        }
        if self.sensor_poll_interval_ms == 0 {
            return Err(Error::Config(
                "sensor_poll_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
