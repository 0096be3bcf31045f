use gatekeep_hardware::HardwareError;
use gatekeep_link::LinkError;
use thiserror::Error;

/// Errors raised by the Control node.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    /// The credential store failed a read or write.
    #[error("Storage fault at 0x{address:03X}: {message}")]
    StorageFault { address: u16, message: String },

    /// Malformed payload or rejected configuration.
    #[error(transparent)]
    Core(#[from] gatekeep_core::Error),
}

impl ControlError {
    pub fn storage_fault(address: u16, message: impl Into<String>) -> Self {
        Self::StorageFault {
            address,
            message: message.into(),
        }
    }

    /// `true` when the peer is gone and no further command can arrive.
    pub fn is_link_lost(&self) -> bool {
        matches!(self, Self::Link(LinkError::Closed | LinkError::Io(_)))
    }
}

pub type ControlResult<T> = std::result::Result<T, ControlError>;
