use gatekeep_hardware::HardwareError;
use gatekeep_link::LinkError;
use thiserror::Error;

/// Errors raised by the HMI session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    /// The Control node answered with a code that does not fit the exchange.
    #[error("Protocol error: {0}")]
    Protocol(#[from] gatekeep_core::Error),

    #[error("Door cycle not finished after {ticks} ticks")]
    DoorCycleTimedOut { ticks: u32 },
}

impl SessionError {
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Link(e) => e.is_timeout(),
            Self::DoorCycleTimedOut { .. } => true,
            _ => false,
        }
    }

    /// `true` when the session cannot continue: the link or a device is gone.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Link(LinkError::Closed | LinkError::Io(_)) | Self::Hardware(_)
        )
    }
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;
