//! Error types for the node transport.

use std::io;

use thiserror::Error;

/// Errors raised while establishing or using a node connection.
///
/// Any error returned from an exchange leaves the connection
/// disconnected; the next operation re-establishes the socket lazily.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Address resolution or the TCP connect to the node failed.
    #[error("failed to connect to node at {endpoint}: {source}")]
    Connect {
        /// Endpoint the dial was aimed at.
        endpoint: String,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// The outbound payload could not be serialised to JSON.
    #[error("failed to serialise frame payload: {0}")]
    Serialise(#[source] serde_json::Error),
    /// The payload is too large for the fixed-width length prefix.
    #[error("frame payload of {0} bytes exceeds the length prefix capacity")]
    FrameTooLarge(usize),
    /// Writing a frame to the socket failed.
    #[error("failed to send frame to node: {0}")]
    Send(#[source] io::Error),
    /// Reading a frame from the socket failed.
    #[error("failed to read frame from node: {0}")]
    Receive(#[source] io::Error),
    /// The node closed the connection while a frame was still expected.
    #[error("node closed the connection mid-frame")]
    UnexpectedEof,
    /// The frame header was not a base-10 length.
    #[error("frame length prefix {0:?} is not a decimal integer")]
    InvalidLengthPrefix(String),
    /// The frame payload was not valid JSON.
    #[error("failed to parse frame payload as JSON: {0}")]
    Parse(#[source] serde_json::Error),
}
