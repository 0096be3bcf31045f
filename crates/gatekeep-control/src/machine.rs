//! Control node protocol machine.
//!
//! The machine waits for one command byte, runs the exchange it names and
//! goes back to waiting. It never halts on its own: mismatches, storage
//! faults, unrecognized bytes and partial payloads all end the current
//! exchange and leave the machine in [`ControlState::AwaitingCommand`].
//!
//! # Exchanges
//!
//! | Command    | Inbound payload | Replies                                         |
//! |------------|-----------------|-------------------------------------------------|
//! | `LOAD`     | 10              | `CORRECT` after persisting, else `FAIL`         |
//! | `VERIFY`   | 5               | `FAIL`, or `CORRECT` + door cycle notifications |
//! | `UPDATE`   | 5, then 10      | `FAIL`, or `CORRECT` then as `LOAD`             |
//! | `ALARM_ON` | none            | none                                            |

use bytes::Bytes;
use gatekeep_core::{
    CandidateBuffer, Credential, Error,
    constants::{CANDIDATE_LENGTH, CREDENTIAL_LENGTH},
};
use gatekeep_hardware::{
    AlarmDevice, CredentialStore, DoorActuator, PresenceSensor, Ticks,
};
use gatekeep_link::{ControlLink, LinkError};
use gatekeep_protocol::{Command, Inbound, Response};
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error, info, warn};

use crate::{
    config::ControlConfig,
    error::{ControlError, ControlResult},
    sequencer::{DoorCycleReport, DoorSequencer},
    vault::CredentialVault,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlState {
    AwaitingCommand,
    LoadCredential,
    VerifyCredential,
    UpdateCredential,
    Alarm,
}

impl fmt::Display for ControlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            ControlState::AwaitingCommand => "AwaitingCommand",
            ControlState::LoadCredential => "LoadCredential",
            ControlState::VerifyCredential => "VerifyCredential",
            ControlState::UpdateCredential => "UpdateCredential",
            ControlState::Alarm => "Alarm",
        };
        write!(f, "{}", state_str)
    }
}

impl From<Command> for ControlState {
    fn from(command: Command) -> Self {
        match command {
            Command::Load => ControlState::LoadCredential,
            Command::Verify => ControlState::VerifyCredential,
            Command::Update => ControlState::UpdateCredential,
            Command::AlarmOn => ControlState::Alarm,
        }
    }
}

/// How one exchange ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// LOAD persisted a new credential and replied `CORRECT`.
    Loaded,
    /// LOAD halves differed; nothing was written.
    LoadMismatch,
    /// VERIFY matched and the door cycle ran.
    Granted(DoorCycleReport),
    /// VERIFY did not match.
    Denied,
    /// UPDATE replaced the credential.
    Updated,
    /// UPDATE probe did not match the stored credential.
    UpdateDenied,
    /// UPDATE replacement halves differed; nothing was written.
    UpdateMismatch,
    /// Alarm sounded for its full duration.
    Alarm,
    /// Byte outside the command table, discarded.
    Ignored(u8),
    /// Payload did not arrive in time; the partial exchange was dropped.
    Abandoned(Command),
    /// Credential store failed; `FAIL` was sent.
    StorageFault { address: u16 },
}

/// Devices owned by the Control node.
#[derive(Debug)]
pub struct ControlPeripherals<S, A, P, B> {
    pub store: S,
    pub actuator: A,
    pub sensor: P,
    pub alarm: B,
}

/// Command interpreter for the Control node.
pub struct ProtocolMachine<T, S, A, P, B> {
    link: ControlLink<T>,
    vault: CredentialVault<S>,
    sequencer: DoorSequencer<A, P>,
    alarm: B,
    ticks: Ticks,
    config: ControlConfig,
    state: ControlState,
}

impl<T, S, A, P, B> ProtocolMachine<T, S, A, P, B>
where
    T: AsyncRead + AsyncWrite + Unpin,
    S: CredentialStore,
    A: DoorActuator,
    P: PresenceSensor,
    B: AlarmDevice,
{
    /// # Errors
    /// Returns `ControlError::Config` if `config` fails validation.
    pub fn new(
        link: ControlLink<T>,
        peripherals: ControlPeripherals<S, A, P, B>,
        ticks: Ticks,
        config: ControlConfig,
    ) -> ControlResult<Self> {
        config.validate()?;
        let ControlPeripherals {
            store,
            actuator,
            sensor,
            alarm,
        } = peripherals;

        Ok(Self {
            link,
            vault: CredentialVault::new(
                store,
                config.store_base_address,
                config.store_write_delay(),
            ),
            sequencer: DoorSequencer::new(actuator, sensor, &config),
            alarm,
            ticks,
            config,
            state: ControlState::AwaitingCommand,
        })
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    pub fn vault(&self) -> &CredentialVault<S> {
        &self.vault
    }

    pub fn sequencer(&self) -> &DoorSequencer<A, P> {
        &self.sequencer
    }

    /// Swap in a new link, e.g. after the HMI reconnects.
    pub fn replace_link(&mut self, link: ControlLink<T>) -> ControlLink<T> {
        self.state = ControlState::AwaitingCommand;
        std::mem::replace(&mut self.link, link)
    }

    /// Serve commands until the link is lost.
    ///
    /// Exchange-level errors are logged and the machine keeps going.
    ///
    /// # Errors
    /// Returns the link error when the transport fails. A clean close by the
    /// peer returns `Ok(())`.
    pub async fn run(&mut self) -> ControlResult<()> {
        info!("Control node awaiting commands");
        loop {
            match self.step().await {
                Ok(outcome) => debug!(outcome = ?outcome, "Exchange finished"),
                Err(ControlError::Link(LinkError::Closed)) => {
                    info!("HMI closed the link");
                    return Ok(());
                }
                Err(e) if e.is_link_lost() => return Err(e),
                Err(e) => error!(error = %e, "Exchange failed"),
            }
        }
    }

    /// Run exactly one exchange.
    pub async fn step(&mut self) -> ControlResult<StepOutcome> {
        self.state = ControlState::AwaitingCommand;
        let command = match self.link.recv_code(None).await? {
            Inbound::Code(command) => command,
            Inbound::Unrecognized(byte) => {
                warn!(
                    byte = format_args!("0x{byte:02X}"),
                    "Unrecognized command byte discarded"
                );
                return Ok(StepOutcome::Ignored(byte));
            }
            Inbound::Payload(bytes) => {
                return Err(LinkError::Protocol(Error::InvalidPayloadLength {
                    command: "command".to_string(),
                    expected: 0,
                    actual: bytes.len(),
                })
                .into());
            }
        };

        self.state = ControlState::from(command);
        info!(%command, "Command received");

        let result = match command {
            Command::Load => self.load().await,
            Command::Verify => self.verify().await,
            Command::Update => self.update().await,
            Command::AlarmOn => self.sound_alarm().await,
        };
        self.state = ControlState::AwaitingCommand;
        result
    }

    async fn load(&mut self) -> ControlResult<StepOutcome> {
        let timeout = Some(self.config.payload_timeout());
        let Some(payload) = self
            .payload(Command::Load, CANDIDATE_LENGTH, timeout, "LOAD payload")
            .await?
        else {
            return Ok(StepOutcome::Abandoned(Command::Load));
        };
        let candidate = CandidateBuffer::from_slice(&payload)?;
        self.store_candidate(candidate, StepOutcome::Loaded, StepOutcome::LoadMismatch)
            .await
    }

    async fn verify(&mut self) -> ControlResult<StepOutcome> {
        let timeout = Some(self.config.payload_timeout());
        let Some(payload) = self
            .payload(Command::Verify, CREDENTIAL_LENGTH, timeout, "VERIFY payload")
            .await?
        else {
            return Ok(StepOutcome::Abandoned(Command::Verify));
        };

        let candidate = Credential::from_slice(&payload)?;
        if let Some(outcome) = self.check(candidate, StepOutcome::Denied).await? {
            return Ok(outcome);
        }

        self.link.send(Response::Correct).await?;
        info!("Access granted");
        let report = self.sequencer.run_cycle(&mut self.link, &self.ticks).await?;
        Ok(StepOutcome::Granted(report))
    }

    async fn update(&mut self) -> ControlResult<StepOutcome> {
        let timeout = Some(self.config.payload_timeout());
        let Some(payload) = self
            .payload(Command::Update, CREDENTIAL_LENGTH, timeout, "UPDATE probe")
            .await?
        else {
            return Ok(StepOutcome::Abandoned(Command::Update));
        };

        let probe = Credential::from_slice(&payload)?;
        if let Some(outcome) = self.check(probe, StepOutcome::UpdateDenied).await? {
            return Ok(outcome);
        }
        self.link.send(Response::Correct).await?;
        debug!("Update probe accepted");

        // The replacement follows without a command byte, at human pace.
        let timeout = self.config.update_entry_timeout();
        let Some(payload) = self
            .payload(Command::Update, CANDIDATE_LENGTH, timeout, "UPDATE replacement")
            .await?
        else {
            return Ok(StepOutcome::Abandoned(Command::Update));
        };
        let candidate = CandidateBuffer::from_slice(&payload)?;
        self.store_candidate(candidate, StepOutcome::Updated, StepOutcome::UpdateMismatch)
            .await
    }

    async fn sound_alarm(&mut self) -> ControlResult<StepOutcome> {
        warn!(ticks = self.config.alarm_ticks, "Alarm on");
        self.alarm.set_active(true).await?;
        let waited = self.ticks.wait(self.config.alarm_ticks).await;
        self.alarm.set_active(false).await?;
        waited?;
        info!("Alarm off");
        Ok(StepOutcome::Alarm)
    }

    /// Compare `candidate` with the stored credential.
    ///
    /// Returns `Some(outcome)` after replying `FAIL`, `None` on a match.
    async fn check(
        &mut self,
        candidate: Credential,
        mismatch: StepOutcome,
    ) -> ControlResult<Option<StepOutcome>> {
        match self.vault.verify(candidate).await {
            Ok(verification) if verification.is_match() => Ok(None),
            Ok(_) => {
                warn!(state = %self.state, "Credential mismatch");
                self.link.send(Response::Fail).await?;
                Ok(Some(mismatch))
            }
            Err(ControlError::StorageFault { address, message }) => {
                error!(address, %message, "Stored credential unreadable");
                self.link.send(Response::Fail).await?;
                Ok(Some(StepOutcome::StorageFault { address }))
            }
            Err(e) => Err(e),
        }
    }

    /// Persist the entered half of `candidate` if both halves agree.
    async fn store_candidate(
        &mut self,
        candidate: CandidateBuffer,
        stored: StepOutcome,
        mismatch: StepOutcome,
    ) -> ControlResult<StepOutcome> {
        if !candidate.halves_match() {
            warn!(state = %self.state, "Confirmation mismatch, credential unchanged");
            self.link.send(Response::Fail).await?;
            return Ok(mismatch);
        }

        match self.vault.persist(candidate.entered()).await {
            Ok(()) => {
                self.link.send(Response::Correct).await?;
                info!(state = %self.state, "Credential stored");
                Ok(stored)
            }
            Err(ControlError::StorageFault { address, message }) => {
                error!(address, %message, "Credential not stored");
                self.link.send(Response::Fail).await?;
                Ok(StepOutcome::StorageFault { address })
            }
            Err(e) => Err(e),
        }
    }

    /// Receive the payload for `command`, or `None` if it stalls.
    async fn payload(
        &mut self,
        command: Command,
        len: usize,
        timeout: Option<Duration>,
        waiting_for: &str,
    ) -> ControlResult<Option<Bytes>> {
        match self.link.recv_payload(len, timeout, waiting_for).await {
            Ok(payload) => Ok(Some(payload)),
            Err(e) if e.is_timeout() => {
                warn!(%command, waiting_for, "Exchange abandoned");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
