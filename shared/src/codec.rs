//! Length-prefixed framing for packets on a byte stream.
//!
//! Each frame is a big-endian `u32` payload length followed by a bincode
//! encoded [`Packet`]. A frame that fails to decode is consumed whole, so the
//! stream stays aligned and the caller may keep reading.

use crate::Packet;
use bincode::{deserialize, serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const MAX_FRAME_LEN: usize = 1024 * 1024;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed packet: {0}")]
    Decode(#[from] bincode::Error),
    #[error("frame of {0} bytes exceeds the frame size limit")]
    FrameTooLarge(usize),
    #[error("connection closed")]
    ConnectionClosed,
}

impl CodecError {
    /// Whether the stream can still be read after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CodecError::Decode(_))
    }
}

pub fn encode(packet: &Packet) -> Result<Vec<u8>, CodecError> {
    let payload = serialize(packet)?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(CodecError::FrameTooLarge(payload.len()));
    }

    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

pub async fn write_frame<W>(writer: &mut W, packet: &Packet) -> Result<(), CodecError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode(packet)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_frame<R>(reader: &mut R) -> Result<Packet, CodecError>
where
    R: AsyncRead + Unpin,
{
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(CodecError::ConnectionClosed)
        }
        Err(e) => return Err(e.into()),
    };

    if len > MAX_FRAME_LEN {
        return Err(CodecError::FrameTooLarge(len));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            CodecError::ConnectionClosed
        } else {
            CodecError::Io(e)
        }
    })?;

    Ok(deserialize(&payload)?)
}
