//! Recording buzzer.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::time::Instant;

use crate::{Result, traits::AlarmDevice};

/// One on/off transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmToggle {
    pub active: bool,
    pub at: Instant,
}

#[derive(Debug)]
pub struct MockAlarm {
    log: Arc<Mutex<Vec<AlarmToggle>>>,
}

impl MockAlarm {
    pub fn new() -> (Self, MockAlarmHandle) {
        let log = Arc::new(Mutex::new(Vec::new()));
        (Self { log: log.clone() }, MockAlarmHandle { log })
    }
}

impl AlarmDevice for MockAlarm {
    async fn set_active(&mut self, active: bool) -> Result<()> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(AlarmToggle {
                active,
                at: Instant::now(),
            });
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct MockAlarmHandle {
    log: Arc<Mutex<Vec<AlarmToggle>>>,
}

impl MockAlarmHandle {
    pub fn toggles(&self) -> Vec<AlarmToggle> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn is_active(&self) -> bool {
        self.toggles().last().is_some_and(|t| t.active)
    }

    /// Number of times the alarm was switched on.
    pub fn activations(&self) -> usize {
        self.toggles().iter().filter(|t| t.active).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_alarm_tracks_state() {
        let (mut alarm, handle) = MockAlarm::new();
        assert!(!handle.is_active());

        alarm.set_active(true).await.unwrap();
        assert!(handle.is_active());
        alarm.set_active(false).await.unwrap();

        assert!(!handle.is_active());
        assert_eq!(handle.activations(), 1);
    }
}
