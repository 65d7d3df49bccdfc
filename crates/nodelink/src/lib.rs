//! Client transport for a remote node speaking length-prefixed JSON
//! frames over TCP.
//!
//! A [`Connection`] owns at most one outbound socket to a fixed
//! [`NodeEndpoint`], serialises complete command exchanges behind an
//! internal lock, and transparently re-establishes the socket after a
//! failure. See [`Connection::command`] for the exchange contract.

mod connection;
mod error;
mod frame;
mod retry;
mod transport;


pub use connection::Connection;
pub use error::ConnectionError;
pub use nodelink_config::NodeEndpoint;
pub use retry::RetryPolicy;
