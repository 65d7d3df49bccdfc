//! Length-prefixed JSON framing for the node wire protocol.
//!
//! Every message on the wire is one frame: a fixed-width ASCII decimal
//! length prefix followed by exactly that many bytes of UTF-8 JSON text.
//! The codec is generic over [`Read`]/[`Write`] so it can be exercised
//! against in-memory buffers as well as live sockets.

use std::io::{ErrorKind, Read, Write};

use serde::Serialize;
use serde_json::Value;

use crate::error::ConnectionError;

/// Width of the decimal length prefix in bytes.
pub(crate) const LENGTH_PREFIX_LEN: usize = 10;

/// Maximum bytes pulled from the socket per read while collecting a payload.
const RECV_CHUNK_LEN: usize = 2048;

/// Serialises `value` into a single frame buffer (prefix plus payload).
pub(crate) fn encode_frame<T>(value: &T) -> Result<Vec<u8>, ConnectionError>
where
    T: Serialize + ?Sized,
{
    let payload = serde_json::to_vec(value).map_err(ConnectionError::Serialise)?;
    let prefix = format!("{:0width$}", payload.len(), width = LENGTH_PREFIX_LEN);
    if prefix.len() != LENGTH_PREFIX_LEN {
        return Err(ConnectionError::FrameTooLarge(payload.len()));
    }
    let mut buffer = Vec::with_capacity(LENGTH_PREFIX_LEN + payload.len());
    buffer.extend_from_slice(prefix.as_bytes());
    buffer.extend_from_slice(&payload);
    Ok(buffer)
}

/// Writes one frame with a single `write_all` so the protocol layer never
/// splits a frame, then flushes.
pub(crate) fn write_frame<W, T>(writer: &mut W, value: &T) -> Result<(), ConnectionError>
where
    W: Write,
    T: Serialize + ?Sized,
{
    let buffer = encode_frame(value)?;
    writer.write_all(&buffer).map_err(ConnectionError::Send)?;
    writer.flush().map_err(ConnectionError::Send)
}

/// Reads one frame, returning `None` when the wait for the header times
/// out.
///
/// The timeout is soft on the header phase only; a timeout once payload
/// bytes are outstanding is reported as a receive failure like any other
/// I/O error.
pub(crate) fn read_frame<R>(reader: &mut R) -> Result<Option<Value>, ConnectionError>
where
    R: Read,
{
    let mut prefix = [0_u8; LENGTH_PREFIX_LEN];
    if let Err(error) = reader.read_exact(&mut prefix) {
        return match error.kind() {
            ErrorKind::WouldBlock | ErrorKind::TimedOut => Ok(None),
            ErrorKind::UnexpectedEof => Err(ConnectionError::UnexpectedEof),
            _ => Err(ConnectionError::Receive(error)),
        };
    }
    let expected = parse_length(&prefix)?;
    let payload = read_payload(reader, expected)?;
    serde_json::from_slice(&payload)
        .map(Some)
        .map_err(ConnectionError::Parse)
}

fn parse_length(prefix: &[u8; LENGTH_PREFIX_LEN]) -> Result<usize, ConnectionError> {
    let text = std::str::from_utf8(prefix).map_err(|_| {
        ConnectionError::InvalidLengthPrefix(String::from_utf8_lossy(prefix).into_owned())
    })?;
    text.parse::<usize>()
        .map_err(|_| ConnectionError::InvalidLengthPrefix(text.to_owned()))
}

fn read_payload<R>(reader: &mut R, expected: usize) -> Result<Vec<u8>, ConnectionError>
where
    R: Read,
{
    // Bound the upfront reservation so a corrupt prefix cannot make us
    // allocate gigabytes before a single payload byte arrives.
    let mut payload = Vec::with_capacity(expected.min(64 * 1024));
    let mut chunk = [0_u8; RECV_CHUNK_LEN];
    while payload.len() < expected {
        let want = RECV_CHUNK_LEN.min(expected - payload.len());
        match reader.read(&mut chunk[..want]) {
            Ok(0) => return Err(ConnectionError::UnexpectedEof),
            Ok(count) => payload.extend_from_slice(&chunk[..count]),
            Err(error) if error.kind() == ErrorKind::Interrupted => {}
            Err(error) => return Err(ConnectionError::Receive(error)),
        }
    }
    Ok(payload)
}
