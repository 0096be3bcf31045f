//! Door sequencer run after a successful VERIFY.
//!
//! # Phases
//!
//! - `Idle`: door closed, no cycle running
//! - `Unlocking`: motor forward for `door_motion_ticks`, then stop
//! - `WaitEntry`: `PEOPLE_IN` sent, presence sensor polled until clear
//! - `Closing`: `PEOPLE_NO` sent, motor reverse for `door_motion_ticks`, then stop
//! - `Closed`: `DOOR_CLOSED` sent
//!
//! # Valid Transitions
//!
//! - Idle → Unlocking → WaitEntry → Closing → Closed → Idle
//!
//! A cycle always runs to completion. If the HMI stops listening halfway
//! through, the notifications are dropped but the door is still closed.
//!
//! # Examples
//!
//! ```
//! use gatekeep_control::DoorPhase;
//!
//! assert!(DoorPhase::Idle.can_transition_to(&DoorPhase::Unlocking));
//! assert!(!DoorPhase::Unlocking.can_transition_to(&DoorPhase::Closing));
//! ```

use chrono::{DateTime, Utc};
use gatekeep_core::Error;
use gatekeep_hardware::{DoorActuator, MotorDirection, PresenceSensor, Ticks};
use gatekeep_link::ControlLink;
use gatekeep_protocol::Response;
use serde::{Deserialize, Serialize};
use std::{collections::VecDeque, fmt, time::Duration};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use crate::{config::ControlConfig, error::ControlResult};

/// Maximum number of transitions kept across cycles.
const MAX_HISTORY_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoorPhase {
    Idle,
    Unlocking,
    WaitEntry,
    Closing,
    Closed,
}

impl fmt::Display for DoorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase_str = match self {
            DoorPhase::Idle => "Idle",
            DoorPhase::Unlocking => "Unlocking",
            DoorPhase::WaitEntry => "WaitEntry",
            DoorPhase::Closing => "Closing",
            DoorPhase::Closed => "Closed",
        };
        write!(f, "{}", phase_str)
    }
}

impl DoorPhase {
    pub fn can_transition_to(&self, target: &DoorPhase) -> bool {
        matches!(
            (self, target),
            (DoorPhase::Idle, DoorPhase::Unlocking)
                | (DoorPhase::Unlocking, DoorPhase::WaitEntry)
                | (DoorPhase::WaitEntry, DoorPhase::Closing)
                | (DoorPhase::Closing, DoorPhase::Closed)
                | (DoorPhase::Closed, DoorPhase::Idle)
        )
    }

    /// Response sent to the HMI when this phase is entered.
    pub fn notification(&self) -> Option<Response> {
        match self {
            DoorPhase::WaitEntry => Some(Response::PeopleIn),
            DoorPhase::Closing => Some(Response::PeopleNo),
            DoorPhase::Closed => Some(Response::DoorClosed),
            DoorPhase::Idle | DoorPhase::Unlocking => None,
        }
    }
}

/// Record of a phase transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: DoorPhase,
    pub to: DoorPhase,
    pub at: DateTime<Utc>,
}

/// Summary of one completed door cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorCycleReport {
    /// Transitions of this cycle, `Idle → Unlocking` first.
    pub transitions: Vec<PhaseTransition>,

    /// The doorway never cleared before the entry timeout.
    pub entry_timed_out: bool,

    /// Sensor reads during `WaitEntry`.
    pub sensor_polls: u64,

    /// Notifications that could not be delivered to the HMI.
    pub undelivered: Vec<Response>,
}

impl DoorCycleReport {
    pub fn phases(&self) -> Vec<DoorPhase> {
        self.transitions.iter().map(|t| t.to).collect()
    }
}

/// Drives the actuator and sensor through one entry event.
#[derive(Debug)]
pub struct DoorSequencer<A, P> {
    actuator: A,
    sensor: P,
    phase: DoorPhase,
    history: VecDeque<PhaseTransition>,
    speed: u8,
    motion_ticks: u32,
    settle: Duration,
    poll_interval: Duration,
    entry_timeout_ticks: Option<u32>,
}

impl<A: DoorActuator, P: PresenceSensor> DoorSequencer<A, P> {
    pub fn new(actuator: A, sensor: P, config: &ControlConfig) -> Self {
        Self {
            actuator,
            sensor,
            phase: DoorPhase::Idle,
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
            speed: config.motor_speed,
            motion_ticks: config.door_motion_ticks,
            settle: config.sensor_settle(),
            poll_interval: config.sensor_poll_interval(),
            entry_timeout_ticks: config.entry_timeout_ticks,
        }
    }

    pub fn phase(&self) -> DoorPhase {
        self.phase
    }

    /// Transitions across all cycles, oldest first.
    pub fn history(&self) -> &VecDeque<PhaseTransition> {
        &self.history
    }

    fn transition_to(&mut self, next: DoorPhase) -> ControlResult<PhaseTransition> {
        if !self.phase.can_transition_to(&next) {
            return Err(Error::InvalidPhaseTransition {
                from: self.phase.to_string(),
                to: next.to_string(),
            }
            .into());
        }

        let transition = PhaseTransition {
            from: self.phase,
            to: next,
            at: Utc::now(),
        };
        debug!(from = %self.phase, to = %next, "Door phase transition");
        self.phase = next;

        self.history.push_back(transition.clone());
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
        Ok(transition)
    }

    /// Force the sequencer back to `Idle` after an aborted cycle.
    fn reset(&mut self) {
        if self.phase != DoorPhase::Idle {
            warn!(phase = %self.phase, "Door sequencer reset");
            self.phase = DoorPhase::Idle;
        }
    }

    /// Run one full door cycle.
    ///
    /// The HMI sees `PEOPLE_IN`, `PEOPLE_NO` and `DOOR_CLOSED` in that order.
    /// Failures to deliver them are recorded in the report, not returned.
    ///
    /// # Errors
    /// Returns `ControlError::Hardware` if the actuator, sensor or tick
    /// source fails. The sequencer is back in `Idle` afterwards.
    pub async fn run_cycle<T>(
        &mut self,
        link: &mut ControlLink<T>,
        ticks: &Ticks,
    ) -> ControlResult<DoorCycleReport>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        // A cycle cancelled mid-way leaves its last phase behind.
        self.reset();
        let result = self.drive(link, ticks).await;
        if result.is_err() {
            if let Err(e) = self.actuator.rotate(MotorDirection::Stop, 0).await {
                warn!(error = %e, "Could not stop door motor");
            }
            self.reset();
        }
        result
    }

    async fn drive<T>(
        &mut self,
        link: &mut ControlLink<T>,
        ticks: &Ticks,
    ) -> ControlResult<DoorCycleReport>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let mut report = DoorCycleReport {
            transitions: Vec::with_capacity(5),
            entry_timed_out: false,
            sensor_polls: 0,
            undelivered: Vec::new(),
        };

        info!("Door unlocking");
        report.transitions.push(self.transition_to(DoorPhase::Unlocking)?);
        self.run_motor(MotorDirection::Forward, ticks).await?;

        report.transitions.push(self.transition_to(DoorPhase::WaitEntry)?);
        self.notify(link, DoorPhase::WaitEntry, &mut report).await;
        tokio::time::sleep(self.settle).await;
        self.wait_for_clear_doorway(ticks, &mut report).await?;

        info!(timed_out = report.entry_timed_out, "Door closing");
        report.transitions.push(self.transition_to(DoorPhase::Closing)?);
        self.notify(link, DoorPhase::Closing, &mut report).await;
        self.run_motor(MotorDirection::Reverse, ticks).await?;

        report.transitions.push(self.transition_to(DoorPhase::Closed)?);
        self.notify(link, DoorPhase::Closed, &mut report).await;
        report.transitions.push(self.transition_to(DoorPhase::Idle)?);

        info!(
            polls = report.sensor_polls,
            undelivered = report.undelivered.len(),
            "Door cycle complete"
        );
        Ok(report)
    }

    async fn run_motor(&mut self, direction: MotorDirection, ticks: &Ticks) -> ControlResult<()> {
        self.actuator.rotate(direction, self.speed).await?;
        ticks.wait(self.motion_ticks).await?;
        self.actuator.rotate(MotorDirection::Stop, 0).await?;
        Ok(())
    }

    async fn wait_for_clear_doorway(
        &mut self,
        ticks: &Ticks,
        report: &mut DoorCycleReport,
    ) -> ControlResult<()> {
        let deadline = self.entry_timeout_ticks.map(|t| ticks.deadline(t));
        loop {
            report.sensor_polls += 1;
            if !self.sensor.presence().await? {
                debug!(polls = report.sensor_polls, "Doorway clear");
                return Ok(());
            }
            if deadline.is_some_and(|d| d.is_reached(ticks.now())) {
                warn!(
                    polls = report.sensor_polls,
                    "Presence still detected at entry timeout, closing anyway"
                );
                report.entry_timed_out = true;
                return Ok(());
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn notify<T>(
        &mut self,
        link: &mut ControlLink<T>,
        phase: DoorPhase,
        report: &mut DoorCycleReport,
    ) where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let Some(response) = phase.notification() else {
            return;
        };
        if let Err(e) = link.send(response).await {
            warn!(%response, error = %e, "Door notification not delivered");
            report.undelivered.push(response);
        }
    }
}
