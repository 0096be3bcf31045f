//! Recording door actuator.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::time::Instant;

use crate::{Result, traits::DoorActuator, types::MotorDirection};

/// One command received by the actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorCommand {
    pub direction: MotorDirection,
    pub speed: u8,
    pub at: Instant,
}

/// Actuator that records every command it receives.
#[derive(Debug)]
pub struct MockActuator {
    log: Arc<Mutex<Vec<ActuatorCommand>>>,
}

impl MockActuator {
    pub fn new() -> (Self, MockActuatorHandle) {
        let log = Arc::new(Mutex::new(Vec::new()));
        (
            Self { log: log.clone() },
            MockActuatorHandle { log },
        )
    }
}

impl DoorActuator for MockActuator {
    async fn rotate(&mut self, direction: MotorDirection, speed: u8) -> Result<()> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ActuatorCommand {
                direction,
                speed,
                at: Instant::now(),
            });
        Ok(())
    }
}

/// Observer for a [`MockActuator`].
#[derive(Debug, Clone)]
pub struct MockActuatorHandle {
    log: Arc<Mutex<Vec<ActuatorCommand>>>,
}

impl MockActuatorHandle {
    pub fn commands(&self) -> Vec<ActuatorCommand> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Directions only, in order.
    pub fn directions(&self) -> Vec<MotorDirection> {
        self.commands().iter().map(|c| c.direction).collect()
    }

    /// Last commanded direction, `Stop` if never driven.
    pub fn current(&self) -> MotorDirection {
        self.commands()
            .last()
            .map_or(MotorDirection::Stop, |c| c.direction)
    }
}
