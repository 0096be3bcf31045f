use gatekeep_protocol::CodecError;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur on the link
#[derive(Debug, Error)]
pub enum LinkError {
    /// The peer did not deliver in time
    #[error("Timed out after {duration_ms}ms waiting for {waiting_for}")]
    TimedOut {
        duration_ms: u64,
        waiting_for: String,
    },

    /// The peer closed the channel
    #[error("Link closed by peer")]
    Closed,

    /// A byte arrived that the protocol does not allow here
    #[error("Protocol error: {0}")]
    Protocol(#[from] gatekeep_core::Error),

    /// Low-level I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LinkError {
    pub fn timed_out(limit: Duration, waiting_for: impl Into<String>) -> Self {
        Self::TimedOut {
            duration_ms: limit.as_millis() as u64,
            waiting_for: waiting_for.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

impl From<CodecError> for LinkError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Protocol(e) => Self::Protocol(e),
            CodecError::Io(e) => Self::Io(e),
        }
    }
}

pub type LinkResult<T> = std::result::Result<T, LinkError>;
