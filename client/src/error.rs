use shared::codec::CodecError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("connection to server closed")]
    ConnectionClosed,
    #[error("server refused to join: {0}")]
    JoinRefused(String),
}
