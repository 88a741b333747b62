//! Control-channel messages exchanged between the coordinator and workers.
//!
//! Messages are JSON objects, one per line. The channel is a worker's stdin
//! (coordinator to worker) and stdout (worker to coordinator), but the
//! framing works over any async byte stream.

use std::io;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::store::User;

const LINE_ENDINGS: &[char] = &['\n', '\r'];

/// A replication message.
///
/// `UpdateUsers` always carries the sender's complete user collection, never a
/// diff. Encoded as `{"type":"updateUsers","users":[...]}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ControlMessage {
    UpdateUsers { users: Vec<User> },
}

/// Reads the next message from `reader`.
///
/// Returns `Ok(None)` on end of stream. Blank lines are skipped. A line that is
/// not a valid message yields an `InvalidData` error; the reader stays
/// positioned after that line, so callers may keep reading.
pub async fn read_message<R>(reader: &mut R) -> io::Result<Option<ControlMessage>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        let bytes = reader.read_line(&mut line).await?;
        if bytes == 0 {
            return Ok(None);
        }

        let trimmed = line.trim_end_matches(LINE_ENDINGS);
        if trimmed.is_empty() {
            continue;
        }

        let parsed = serde_json::from_str(trimmed).map_err(to_io_error)?;
        return Ok(Some(parsed));
    }
}

/// Writes `message` followed by a newline and flushes.
pub async fn write_message<W>(writer: &mut W, message: &ControlMessage) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let encoded = encode_line(message)?;
    writer.write_all(&encoded).await?;
    writer.flush().await
}

/// Encodes `message` as a single newline-terminated JSON line.
pub fn encode_line(message: &ControlMessage) -> io::Result<Vec<u8>> {
    let mut encoded = serde_json::to_vec(message).map_err(to_io_error)?;
    encoded.push(b'\n');
    Ok(encoded)
}

fn to_io_error(err: serde_json::Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, err)
}
