//! Presence sensor mocks.

use std::time::Duration;
use tokio::{sync::watch, time::Instant};

use crate::{Result, traits::PresenceSensor};

/// Sensor whose reading is set through a handle.
#[derive(Debug)]
pub struct MockSensor {
    presence_rx: watch::Receiver<bool>,
    polls: u64,
}

impl MockSensor {
    pub fn new(initial: bool) -> (Self, MockSensorHandle) {
        let (presence_tx, presence_rx) = watch::channel(initial);
        (
            Self {
                presence_rx,
                polls: 0,
            },
            MockSensorHandle { presence_tx },
        )
    }

    /// Number of reads so far.
    pub fn polls(&self) -> u64 {
        self.polls
    }
}

impl PresenceSensor for MockSensor {
    async fn presence(&mut self) -> Result<bool> {
        self.polls += 1;
        Ok(*self.presence_rx.borrow())
    }
}

/// Handle for setting a [`MockSensor`]'s reading.
#[derive(Debug, Clone)]
pub struct MockSensorHandle {
    presence_tx: watch::Sender<bool>,
}

impl MockSensorHandle {
    pub fn set_presence(&self, present: bool) {
        self.presence_tx.send_replace(present);
    }

    /// Report presence now and clear it after `duration`.
    pub fn occupy_for(&self, duration: Duration) {
        self.set_presence(true);
        let presence_tx = self.presence_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            presence_tx.send_replace(false);
        });
    }
}

/// Sensor that reports a person passing through for a fixed time.
///
/// The passage starts at the first read, which is when the door has just
/// opened, and repeats for every door cycle.
#[derive(Debug)]
pub struct SimulatedSensor {
    passage: Duration,
    clear_at: Option<Instant>,
}

impl SimulatedSensor {
    pub fn new(passage: Duration) -> Self {
        Self {
            passage,
            clear_at: None,
        }
    }
}

impl PresenceSensor for SimulatedSensor {
    async fn presence(&mut self) -> Result<bool> {
        let now = Instant::now();
        let clear_at = *self.clear_at.get_or_insert(now + self.passage);
        if now >= clear_at {
            self.clear_at = None;
            return Ok(false);
        }
        Ok(true)
    }
}
