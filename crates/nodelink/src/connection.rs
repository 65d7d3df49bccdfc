//! A persistent command connection to a single remote node.
//!
//! The connection owns at most one live TCP stream at a time. The frame
//! sequence of one command exchange is serialised under an internal lock,
//! any I/O failure discards the stream, and the next operation
//! re-establishes it lazily.

use std::net::{Shutdown, TcpStream};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use nodelink_config::NodeEndpoint;

use crate::error::ConnectionError;
use crate::frame;
use crate::retry::RetryPolicy;
use crate::transport;

const CONNECTION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::connection");

/// Live socket handle plus the advisory activity stamp.
#[derive(Debug)]
struct Link {
    stream: TcpStream,
    last_activity: Instant,
}

impl Link {
    fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            last_activity: Instant::now(),
        }
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}

/// Client connection to one node endpoint with transparent reconnect.
///
/// [`Connection::command`] may be called from multiple threads on one
/// shared value; the internal lock serialises complete exchanges so the
/// frames of concurrent commands never interleave on the wire.
#[derive(Debug)]
pub struct Connection {
    endpoint: NodeEndpoint,
    verbose: bool,
    retry: RetryPolicy,
    logical_timeout: Duration,
    /// `None` is disconnected, `Some` owns the single live stream. Every
    /// transition happens inside this mutex, which doubles as the command
    /// lock.
    link: Mutex<Option<Link>>,
}

impl Connection {
    /// Builds a connection to `endpoint`. No socket is opened until the
    /// first operation needs one.
    #[must_use]
    pub fn new(endpoint: NodeEndpoint) -> Self {
        Self {
            endpoint,
            verbose: false,
            retry: RetryPolicy::default(),
            logical_timeout: transport::DEFAULT_LOGICAL_TIMEOUT,
            link: Mutex::new(None),
        }
    }

    /// Enables connection diagnostics via `tracing`.
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Overrides the resend policy for the opening command frame.
    #[must_use]
    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Overrides the bound applied to each blocking read or write.
    #[must_use]
    pub fn logical_timeout(mut self, timeout: Duration) -> Self {
        self.logical_timeout = timeout;
        self
    }

    /// Endpoint this connection dials.
    #[must_use]
    pub fn endpoint(&self) -> &NodeEndpoint {
        &self.endpoint
    }

    /// Eagerly establishes the socket, for callers that want to fail
    /// fast instead of waiting for the first command.
    pub fn connect(&self) -> Result<(), ConnectionError> {
        let mut link = self.lock_link();
        self.ensure_connected(&mut link).map(|_| ())
    }

    /// Sends `name` and then each option as its own frame, and waits for
    /// the single response frame.
    ///
    /// Returns `Ok(None)` when the node does not answer within the
    /// logical timeout; the socket is discarded because a stale response
    /// could still arrive on it later. Any error also leaves the
    /// connection disconnected and the next call reconnects
    /// transparently, so callers should treat errors as "this exchange
    /// did not complete" and re-issue the whole command.
    pub fn command<T>(&self, name: &T, options: &[Value]) -> Result<Option<Value>, ConnectionError>
    where
        T: Serialize + ?Sized,
    {
        let mut link = self.lock_link();
        self.send_opening_frame(&mut link, name)?;
        for option in options {
            if let Err(error) = self.send_frame(&mut link, option) {
                if self.verbose {
                    warn!(
                        target: CONNECTION_TARGET,
                        %error,
                        "option frame send failed, not retrying"
                    );
                }
                return Err(error);
            }
        }
        self.receive_frame(&mut link)
    }

    /// Shuts the socket down best-effort. Never fails; the connection
    /// stays usable and reconnects lazily on the next operation.
    pub fn close(&self) {
        let mut link = self.lock_link();
        if let Some(handle) = link.take() {
            let _ = handle.stream.shutdown(Shutdown::Both);
        }
    }

    /// Instant of the last successful send or receive, when connected.
    #[must_use]
    pub fn last_activity(&self) -> Option<Instant> {
        self.lock_link().as_ref().map(|handle| handle.last_activity)
    }

    /// Whether a live socket is currently held.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.lock_link().is_some()
    }

    /// Severs the live socket while leaving it installed, so the next
    /// send observes a dead stream.
    #[cfg(any(test, feature = "test-support"))]
    pub fn sever(&self) {
        let link = self.lock_link();
        if let Some(handle) = link.as_ref() {
            let _ = handle.stream.shutdown(Shutdown::Both);
        }
    }

    fn lock_link(&self) -> MutexGuard<'_, Option<Link>> {
        match self.link.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                // A caller that panicked mid-exchange may have left a
                // half-written frame on the wire; the handle cannot be
                // trusted.
                let mut guard = poisoned.into_inner();
                *guard = None;
                guard
            }
        }
    }

    fn ensure_connected<'a>(
        &self,
        link: &'a mut Option<Link>,
    ) -> Result<&'a mut Link, ConnectionError> {
        match link {
            Some(handle) => Ok(handle),
            None => {
                if self.verbose {
                    info!(
                        target: CONNECTION_TARGET,
                        endpoint = %self.endpoint,
                        "connecting to node"
                    );
                }
                let stream = transport::dial(&self.endpoint, self.logical_timeout)?;
                Ok(link.insert(Link::new(stream)))
            }
        }
    }

    fn send_opening_frame<T>(
        &self,
        link: &mut Option<Link>,
        name: &T,
    ) -> Result<(), ConnectionError>
    where
        T: Serialize + ?Sized,
    {
        let mut resends_left = self.retry.max_resends();
        loop {
            match self.send_frame(link, name) {
                Ok(()) => return Ok(()),
                Err(error) if resends_left > 0 => {
                    resends_left -= 1;
                    if self.verbose {
                        warn!(
                            target: CONNECTION_TARGET,
                            %error,
                            "command frame send failed, reconnecting"
                        );
                    }
                }
                Err(error) => return Err(error),
            }
        }
    }

    fn send_frame<T>(&self, link: &mut Option<Link>, payload: &T) -> Result<(), ConnectionError>
    where
        T: Serialize + ?Sized,
    {
        let result = {
            let handle = self.ensure_connected(link)?;
            let written = frame::write_frame(&mut handle.stream, payload);
            if written.is_ok() {
                handle.touch();
            }
            written
        };
        match result {
            Ok(()) => {
                if self.verbose {
                    if let Ok(text) = serde_json::to_string(payload) {
                        info!(target: CONNECTION_TARGET, payload = %text, "frame sent");
                    }
                }
                Ok(())
            }
            Err(error) => {
                *link = None;
                Err(error)
            }
        }
    }

    fn receive_frame(&self, link: &mut Option<Link>) -> Result<Option<Value>, ConnectionError> {
        let outcome = {
            let handle = self.ensure_connected(link)?;
            frame::read_frame(&mut handle.stream)
        };
        match outcome {
            Ok(Some(value)) => {
                if let Some(handle) = link.as_mut() {
                    handle.touch();
                }
                Ok(Some(value))
            }
            Ok(None) => {
                // The node may still deliver the stale response later, so
                // the stream cannot be reused for another exchange.
                *link = None;
                if self.verbose {
                    warn!(
                        target: CONNECTION_TARGET,
                        "no response within the logical timeout"
                    );
                }
                Ok(None)
            }
            Err(error) => {
                *link = None;
                Err(error)
            }
        }
    }
}
