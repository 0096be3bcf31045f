use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Protocol errors
    #[error("Unrecognized command byte: 0x{0:02X}")]
    UnrecognizedCommand(u8),

    #[error("Unrecognized response byte: 0x{0:02X}")]
    UnrecognizedResponse(u8),

    #[error("Unexpected response: expected {expected}, got {actual}")]
    UnexpectedResponse { expected: String, actual: String },

    #[error("Invalid payload length for {command}: expected {expected}, got {actual}")]
    InvalidPayloadLength {
        command: String,
        expected: usize,
        actual: usize,
    },

    // Credential errors
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    // State machine errors
    #[error("Invalid phase transition from {from} to {to}")]
    InvalidPhaseTransition { from: String, to: String },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
