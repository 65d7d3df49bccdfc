//! Socket dialling for the node transport.
//!
//! Encapsulates address resolution and connect so the connection logic
//! only ever sees a stream that already carries its per-call timeouts.

use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use nodelink_config::NodeEndpoint;

use crate::error::ConnectionError;

/// Bound on the TCP connect itself, distinct from the per-call logical
/// timeout applied to reads and writes.
pub(crate) const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default bound applied to every blocking read or write on the stream.
pub(crate) const DEFAULT_LOGICAL_TIMEOUT: Duration = Duration::from_secs(45);

/// Dials the node and applies `logical_timeout` to every subsequent
/// blocking call on the returned stream.
pub(crate) fn dial(
    endpoint: &NodeEndpoint,
    logical_timeout: Duration,
) -> Result<TcpStream, ConnectionError> {
    let address =
        resolve_address(endpoint.host(), endpoint.port()).map_err(|source| connect_error(endpoint, source))?;
    let stream = TcpStream::connect_timeout(&address, CONNECT_TIMEOUT)
        .map_err(|source| connect_error(endpoint, source))?;
    stream
        .set_read_timeout(Some(logical_timeout))
        .map_err(|source| connect_error(endpoint, source))?;
    stream
        .set_write_timeout(Some(logical_timeout))
        .map_err(|source| connect_error(endpoint, source))?;
    Ok(stream)
}

fn connect_error(endpoint: &NodeEndpoint, source: io::Error) -> ConnectionError {
    ConnectionError::Connect {
        endpoint: endpoint.to_string(),
        source,
    }
}

fn resolve_address(host: &str, port: u16) -> io::Result<SocketAddr> {
    let mut addresses = (host, port).to_socket_addrs()?;
    addresses
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses"))
}
