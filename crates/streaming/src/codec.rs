//! Frame codec.
//!
//! A frame is a 4 byte big-endian payload length followed by the bincode
//! encoding of one [`Message`].

use crate::error::{Result, StreamingError};
use crate::protocol::Message;
use bytes::{BufMut, Bytes, BytesMut};
use std::io::ErrorKind;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const FRAME_HEADER_LEN: usize = 4;

/// Upper bound on a single frame, header included.
pub const MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

/// Encode `message` into a complete frame.
///
/// # Errors
///
/// Returns [`StreamingError::FrameTooLarge`] when the frame would exceed
/// `max_frame_bytes`.
pub fn encode_frame(message: &Message, max_frame_bytes: usize) -> Result<Bytes> {
    let payload = bincode::serialize(message)?;
    let size = payload.len() + FRAME_HEADER_LEN;
    if size > max_frame_bytes {
        return Err(StreamingError::FrameTooLarge {
            size,
            max: max_frame_bytes,
        });
    }
    let mut frame = BytesMut::with_capacity(size);
    frame.put_u32(payload.len() as u32);
    frame.put_slice(&payload);
    Ok(frame.freeze())
}

/// Payload length announced by a frame header.
pub fn decode_frame_header(header: [u8; FRAME_HEADER_LEN], max_frame_bytes: usize) -> Result<usize> {
    let len = u32::from_be_bytes(header) as usize;
    if len + FRAME_HEADER_LEN > max_frame_bytes {
        return Err(StreamingError::FrameTooLarge {
            size: len + FRAME_HEADER_LEN,
            max: max_frame_bytes,
        });
    }
    Ok(len)
}

pub async fn write_message<W>(writer: &mut W, message: &Message) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(message, MAX_FRAME_BYTES)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one message. Returns `None` if the peer closed the stream cleanly
/// before starting a new frame.
pub async fn read_message<R>(reader: &mut R) -> Result<Option<Message>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; FRAME_HEADER_LEN];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = decode_frame_header(header, MAX_FRAME_BYTES)?;
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(bincode::deserialize(&payload)?))
}
