//! HMI session controller.
//!
//! # Lifecycle
//!
//! 1. Enrollment: prompt for a credential and its confirmation, send LOAD,
//!    repeat until the Control node replies `CORRECT`. No retry limit.
//! 2. Operating: show the menu forever. `+` runs [`SessionController::open_door`],
//!    `-` runs [`SessionController::change_credential`].
//!
//! Each operating path has its own [`LockoutGovernor`]. On lockout the HMI
//! sends `ALARM_ON` and keeps the keypad locked for `alarm_ticks`.
//!
//! Keypad entry is collected before anything is sent, so a request always
//! goes out as one piece and the Control node never waits on a human except
//! for the second UPDATE stage.

use gatekeep_core::{CandidateBuffer, Credential, Error, TimeoutDeadline, Verification};
use gatekeep_hardware::{CharacterDisplay, Key, KeypadDevice, Ticks};
use gatekeep_link::HmiLink;
use gatekeep_protocol::{Request, Response};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error, info, warn};

use crate::{
    config::HmiConfig,
    entry::read_masked,
    error::{SessionError, SessionResult},
    lockout::{FailureVerdict, LockoutGovernor},
    screen::Screen,
};

/// Menu choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuChoice {
    OpenDoor,
    ChangeCredential,
}

impl MenuChoice {
    pub fn from_key(key: Key) -> Option<Self> {
        match key {
            Key::Plus => Some(MenuChoice::OpenDoor),
            Key::Minus => Some(MenuChoice::ChangeCredential),
            _ => None,
        }
    }
}

/// How one session exchange ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    Enrolled,
    DoorOpened,
    /// Wrong credential, `failures` in a row on this path.
    Denied { failures: u8 },
    /// Limit reached; alarm raised and cooldown served.
    LockedOut,
    CredentialChanged,
    /// New credential and its confirmation differed.
    ConfirmationMismatch,
    /// The Control node did not answer in time.
    LinkTimeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Enrollment,
    Operating,
}

pub struct SessionController<T, K, D> {
    link: HmiLink<T>,
    keypad: K,
    display: D,
    ticks: Ticks,
    config: HmiConfig,
    phase: SessionPhase,
    open_governor: LockoutGovernor,
    change_governor: LockoutGovernor,
}

impl<T, K, D> SessionController<T, K, D>
where
    T: AsyncRead + AsyncWrite + Unpin,
    K: KeypadDevice,
    D: CharacterDisplay,
{
    /// # Errors
    /// Returns `SessionError::Protocol` if `config` fails validation.
    pub fn new(
        link: HmiLink<T>,
        keypad: K,
        display: D,
        ticks: Ticks,
        config: HmiConfig,
    ) -> SessionResult<Self> {
        config.validate()?;
        Ok(Self {
            link,
            keypad,
            display,
            ticks,
            open_governor: LockoutGovernor::new(config.max_failures),
            change_governor: LockoutGovernor::new(config.max_failures),
            config,
            phase: SessionPhase::Enrollment,
        })
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn open_failures(&self) -> u8 {
        self.open_governor.failures()
    }

    pub fn change_failures(&self) -> u8 {
        self.change_governor.failures()
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Enroll, then serve the menu until a device or the link goes away.
    ///
    /// # Errors
    /// Returns the first fatal error (see [`SessionError::is_fatal`]).
    pub async fn run(&mut self) -> SessionResult<()> {
        self.enroll().await?;
        loop {
            let choice = self.choose().await?;
            match self.serve(choice).await {
                Ok(outcome) => info!(?choice, ?outcome, "Session exchange finished"),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    error!(error = %e, "Session exchange failed");
                    self.link.discard_pending();
                }
            }
        }
    }

    /// Run the enrollment phase until the Control node accepts a credential.
    pub async fn enroll(&mut self) -> SessionResult<SessionOutcome> {
        info!("Enrollment started");
        loop {
            let candidate = self.read_new_credential(Screen::EnterCredential).await?;
            self.link.send(Request::Load(candidate)).await?;

            match self.verdict("LOAD reply").await {
                Ok(Verification::Match) => {
                    info!("Credential enrolled");
                    self.phase = SessionPhase::Operating;
                    return Ok(SessionOutcome::Enrolled);
                }
                Ok(Verification::Mismatch) => {
                    warn!("Enrollment confirmation mismatch");
                    self.notice(Screen::Mismatch).await?;
                }
                Err(e) if e.is_timeout() => self.link_timeout().await?,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    error!(error = %e, "Enrollment exchange failed");
                    self.link.discard_pending();
                }
            }
        }
    }

    /// Show the menu and wait for `+` or `-`.
    pub async fn choose(&mut self) -> SessionResult<MenuChoice> {
        Screen::Menu.show(&mut self.display).await?;
        loop {
            let key = self.keypad.read_key().await?;
            if let Some(choice) = MenuChoice::from_key(key) {
                debug!(?choice, "Menu choice");
                return Ok(choice);
            }
        }
    }

    /// Run one menu choice. A link timeout is shown and reported as an outcome.
    pub async fn serve(&mut self, choice: MenuChoice) -> SessionResult<SessionOutcome> {
        let result = match choice {
            MenuChoice::OpenDoor => self.open_door().await,
            MenuChoice::ChangeCredential => self.change_credential().await,
        };
        match result {
            Err(e) if e.is_timeout() => {
                self.link_timeout().await?;
                Ok(SessionOutcome::LinkTimeout)
            }
            other => other,
        }
    }

    /// Request a door opening and follow the door cycle to its end.
    pub async fn open_door(&mut self) -> SessionResult<SessionOutcome> {
        let credential = self.read_credential(Screen::EnterOldCredential).await?;
        self.link.send(Request::Verify(credential)).await?;

        if self.verdict("VERIFY reply").await? == Verification::Mismatch {
            return self.failed_attempt(MenuChoice::OpenDoor).await;
        }
        self.open_governor.record_success();
        info!("Access granted");

        let deadline = self
            .config
            .door_cycle_timeout_ticks
            .map(|ticks| self.ticks.deadline(ticks));
        Screen::DoorUnlocking.show(&mut self.display).await?;
        self.door_notification(Response::PeopleIn, deadline).await?;
        Screen::WaitForPeople.show(&mut self.display).await?;
        self.door_notification(Response::PeopleNo, deadline).await?;
        Screen::DoorLocking.show(&mut self.display).await?;
        self.door_notification(Response::DoorClosed, deadline).await?;
        info!("Door cycle complete");

        Ok(SessionOutcome::DoorOpened)
    }

    /// Prove the old credential, then replace it.
    pub async fn change_credential(&mut self) -> SessionResult<SessionOutcome> {
        let probe = self.read_credential(Screen::EnterOldCredential).await?;
        self.link.send(Request::UpdateProbe(probe)).await?;

        if self.verdict("UPDATE probe reply").await? == Verification::Mismatch {
            return self.failed_attempt(MenuChoice::ChangeCredential).await;
        }
        self.change_governor.record_success();
        debug!("Update probe accepted");

        let candidate = self.read_new_credential(Screen::EnterNewCredential).await?;
        self.link.send(Request::UpdateReplacement(candidate)).await?;

        match self.verdict("UPDATE reply").await? {
            Verification::Match => {
                info!("Credential changed");
                Ok(SessionOutcome::CredentialChanged)
            }
            Verification::Mismatch => {
                warn!("New credential confirmation mismatch");
                self.notice(Screen::Mismatch).await?;
                Ok(SessionOutcome::ConfirmationMismatch)
            }
        }
    }

    async fn failed_attempt(&mut self, path: MenuChoice) -> SessionResult<SessionOutcome> {
        let governor = match path {
            MenuChoice::OpenDoor => &mut self.open_governor,
            MenuChoice::ChangeCredential => &mut self.change_governor,
        };
        match governor.record_failure() {
            FailureVerdict::Retry { failures } => {
                warn!(?path, failures, "Incorrect credential");
                self.notice(Screen::Incorrect).await?;
                Ok(SessionOutcome::Denied { failures })
            }
            FailureVerdict::Lockout => {
                self.lockout(path).await?;
                Ok(SessionOutcome::LockedOut)
            }
        }
    }

    async fn lockout(&mut self, path: MenuChoice) -> SessionResult<()> {
        warn!(?path, ticks = self.config.alarm_ticks, "Too many failures, locking");
        self.link.send(Request::AlarmOn).await?;
        Screen::Locked.show(&mut self.display).await?;
        self.ticks.wait(self.config.alarm_ticks).await?;
        let dropped = self.keypad.discard_pending();
        info!(dropped, "Lockout over");
        Ok(())
    }

    /// Wait for one door cycle notification, within the cycle `deadline`.
    ///
    /// On overrun the rest of the cycle is consumed before returning, so late
    /// notifications are never read as the reply to the next request.
    async fn door_notification(
        &mut self,
        expected: Response,
        deadline: Option<TimeoutDeadline>,
    ) -> SessionResult<()> {
        let Some(deadline) = deadline else {
            self.link.expect_response(expected, None).await?;
            return Ok(());
        };

        let overran = tokio::select! {
            biased;
            result = self.link.expect_response(expected, None) => {
                result?;
                false
            }
            result = self.ticks.wait_until(deadline) => {
                result?;
                true
            }
        };
        if !overran {
            return Ok(());
        }

        let ticks = self.config.door_cycle_timeout_ticks.unwrap_or_default();
        warn!(%expected, ticks, "Door cycle overran");
        self.finish_overrun_cycle(ticks).await?;
        Err(SessionError::DoorCycleTimedOut { ticks })
    }

    /// Read until `DOOR_CLOSED`. Every notification restarts a `window`-tick
    /// wait; a Control node silent for a whole window is given up on.
    async fn finish_overrun_cycle(&mut self, window: u32) -> SessionResult<()> {
        loop {
            let deadline = self.ticks.deadline(window);
            let received = tokio::select! {
                biased;
                result = self.link.recv_response(None, "end of door cycle") => Some(result?),
                result = self.ticks.wait_until(deadline) => {
                    result?;
                    None
                }
            };
            match received {
                Some(Response::DoorClosed) => {
                    info!("Overrun door cycle finished");
                    return Ok(());
                }
                Some(response) => debug!(%response, "Discarding late door cycle notification"),
                None => {
                    warn!(window, "Control node silent after door cycle overrun");
                    return Ok(());
                }
            }
        }
    }

    /// Wait for `CORRECT` or `FAIL`.
    async fn verdict(&mut self, waiting_for: &str) -> SessionResult<Verification> {
        let timeout = Some(self.config.response_timeout());
        match self.link.recv_response(timeout, waiting_for).await? {
            Response::Correct => Ok(Verification::Match),
            Response::Fail => Ok(Verification::Mismatch),
            other => Err(SessionError::Protocol(Error::UnexpectedResponse {
                expected: "CORRECT or FAIL".to_string(),
                actual: other.to_string(),
            })),
        }
    }

    async fn read_credential(&mut self, prompt: Screen) -> SessionResult<Credential> {
        prompt.show(&mut self.display).await?;
        let cursor = prompt.entry_cursor().unwrap_or((1, 0));
        read_masked(&mut self.keypad, &mut self.display, cursor).await
    }

    /// Prompt for a credential and its confirmation.
    async fn read_new_credential(&mut self, prompt: Screen) -> SessionResult<CandidateBuffer> {
        let entry = self.read_credential(prompt).await?;
        let confirmation = self.read_credential(Screen::ConfirmCredential).await?;
        Ok(CandidateBuffer::from_entry_and_confirmation(
            entry,
            confirmation,
        ))
    }

    async fn notice(&mut self, screen: Screen) -> SessionResult<()> {
        screen.show(&mut self.display).await?;
        self.ticks.wait(self.config.notice_ticks).await?;
        Ok(())
    }

    async fn link_timeout(&mut self) -> SessionResult<()> {
        self.link.discard_pending();
        self.notice(Screen::LinkTimeout).await
    }
}
