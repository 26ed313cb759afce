use shared::codec::CodecError;
use thiserror::Error;

/// Failures of the server's transport, as opposed to rejected game commands.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("listener already started")]
    AlreadyRunning,
}
