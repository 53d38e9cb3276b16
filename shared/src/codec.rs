//! Length-delimited framing over a byte stream.
//!
//! Wire format: a 4-byte big-endian length prefix followed by a
//! bincode-serialized payload. The functions here move raw bytes; callers
//! serialize and deserialize with `bincode` themselves, which keeps the
//! framing layer independent of the message types.

use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum allowed frame size. State snapshots are the largest messages on
/// this protocol and stay well under a kilobyte; 64 KB is generous headroom
/// while still bounding allocation from a malformed length prefix.
pub const MAX_FRAME_SIZE: u32 = 64 * 1024;

/// Write a length-delimited frame: 4-byte big-endian length, then payload.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    let len = payload.len();
    if len > MAX_FRAME_SIZE as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("frame too large: {len} bytes (max {MAX_FRAME_SIZE})"),
        ));
    }
    writer.write_all(&(len as u32).to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read a length-delimited frame: 4-byte big-endian length, then payload.
///
/// Returns `UnexpectedEof` when the stream closes before or during a frame,
/// and `InvalidData` when the length prefix exceeds [`MAX_FRAME_SIZE`].
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame too large: {len} bytes (max {MAX_FRAME_SIZE})"),
        ));
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}
