//! Scripted fake node used by the behavioural tests.
//!
//! Binds an ephemeral TCP listener and services a fixed script of
//! sessions, recording every frame the client sends and streaming canned
//! replies back in the wire format.

use std::io::{self, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use serde_json::Value;

use crate::frame;

/// Reply issued once the reads of an exchange are done.
pub(crate) enum Reply {
    /// Encode and send this value as a frame.
    Frame(Value),
    /// Send back the first frame read in this exchange.
    EchoFirst,
    /// Send these bytes verbatim, for malformed-frame scripts.
    Raw(Vec<u8>),
    /// Send nothing.
    Silent,
}

/// One request/response step within a session.
pub(crate) struct Exchange {
    pub(crate) reads: usize,
    pub(crate) reply: Reply,
}

/// How a session ends once its exchanges are done.
pub(crate) enum Finale {
    /// Close the stream normally.
    Close,
    /// Keep the stream open for this long before closing.
    Linger(Duration),
    /// Abort the stream with an RST so pending client writes fail.
    Reset,
}

/// Script for one accepted connection.
pub(crate) struct Session {
    exchanges: Vec<Exchange>,
    finale: Finale,
}

impl Session {
    pub(crate) fn new(exchanges: Vec<Exchange>) -> Self {
        Self {
            exchanges,
            finale: Finale::Close,
        }
    }

    pub(crate) fn with_finale(mut self, finale: Finale) -> Self {
        self.finale = finale;
        self
    }
}

/// A fake node serving a fixed session script on an ephemeral port.
pub(crate) struct FakeNode {
    port: u16,
    frames: Arc<Mutex<Vec<Value>>>,
    outcome: Arc<Mutex<Option<Result<()>>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FakeNode {
    /// Spawns a node servicing `sessions`, one per accepted connection.
    pub(crate) fn spawn(sessions: Vec<Session>) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake node")?;
        listener
            .set_nonblocking(true)
            .context("fake node nonblocking")?;
        let port = listener.local_addr().context("local addr")?.port();
        let frames: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
        let outcome: Arc<Mutex<Option<Result<()>>>> = Arc::new(Mutex::new(None));
        let frames_clone = Arc::clone(&frames);
        let outcome_clone = Arc::clone(&outcome);
        let handle = thread::spawn(move || {
            let result = serve(&listener, sessions, &frames_clone);
            if let Ok(mut guard) = outcome_clone.lock() {
                *guard = Some(result);
            }
        });
        Ok(Self {
            port,
            frames,
            outcome,
            handle: Some(handle),
        })
    }

    pub(crate) fn port(&self) -> u16 {
        self.port
    }

    /// Waits for the script to finish and returns every frame received,
    /// in wire order.
    pub(crate) fn take_frames(&mut self) -> Result<Vec<Value>> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("fake node thread panicked"))?;
        }
        if let Some(result) = self
            .outcome
            .lock()
            .map_err(|error| anyhow!("lock fake node outcome: {error}"))?
            .take()
        {
            result.context("fake node failed")?;
        }
        let frames = self
            .frames
            .lock()
            .map_err(|error| anyhow!("lock frames: {error}"))?;
        Ok(frames.clone())
    }
}

impl Drop for FakeNode {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn serve(
    listener: &TcpListener,
    sessions: Vec<Session>,
    frames: &Arc<Mutex<Vec<Value>>>,
) -> Result<()> {
    for session in sessions {
        let Some(stream) = accept_with_deadline(listener)? else {
            // The client aborted before connecting; stop serving quietly
            // so tests that expect the error path do not hang here.
            return Ok(());
        };
        run_session(stream, session, frames)?;
    }
    Ok(())
}

fn accept_with_deadline(listener: &TcpListener) -> Result<Option<TcpStream>> {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        match listener.accept() {
            Ok((stream, _)) => return Ok(Some(stream)),
            Err(ref error)
                if error.kind() == io::ErrorKind::WouldBlock && Instant::now() < deadline =>
            {
                thread::sleep(Duration::from_millis(10));
            }
            Err(ref error) if error.kind() == io::ErrorKind::WouldBlock => return Ok(None),
            Err(error) => return Err(error).context("accept connection"),
        }
    }
}

fn run_session(
    mut stream: TcpStream,
    session: Session,
    frames: &Arc<Mutex<Vec<Value>>>,
) -> Result<()> {
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .context("set fake node read timeout")?;
    for exchange in session.exchanges {
        let mut first = None;
        for _ in 0..exchange.reads {
            let value = frame::read_frame(&mut stream)
                .context("fake node read")?
                .ok_or_else(|| anyhow!("fake node timed out waiting for a frame"))?;
            if first.is_none() {
                first = Some(value.clone());
            }
            frames
                .lock()
                .map_err(|error| anyhow!("lock frames: {error}"))?
                .push(value);
        }
        match exchange.reply {
            Reply::Frame(value) => {
                frame::write_frame(&mut stream, &value).context("fake node write")?;
            }
            Reply::EchoFirst => {
                let value = first.ok_or_else(|| anyhow!("echo reply without reads"))?;
                frame::write_frame(&mut stream, &value).context("fake node write")?;
            }
            Reply::Raw(bytes) => {
                stream.write_all(&bytes).context("fake node raw write")?;
                stream.flush().context("fake node flush")?;
            }
            Reply::Silent => {}
        }
    }
    match session.finale {
        Finale::Close => {}
        Finale::Linger(duration) => thread::sleep(duration),
        Finale::Reset => {
            let socket = socket2::SockRef::from(&stream);
            socket
                .set_linger(Some(Duration::ZERO))
                .context("set linger for reset")?;
        }
    }
    Ok(())
}
