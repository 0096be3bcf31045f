use thiserror::Error;

/// Errors raised while framing bytes on the link.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error(transparent)]
    Protocol(#[from] gatekeep_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CodecResult<T> = std::result::Result<T, CodecError>;
