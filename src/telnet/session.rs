use std::fmt;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::time::Duration;

use log::{debug, info, warn};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::console::Console;
use crate::telnet::negotiation::{Action, ESCAPE, Negotiator};

const RECV_BUFFER: usize = 1024;

#[derive(Debug, Error)]
pub enum TelnetError {
    #[error("Cannot determine host {host}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },
    #[error("Error connecting - no/bad response.")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },
    #[error("Error connecting - no response after {0:?}")]
    Timeout(Duration),
    #[error("connection error")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Connected,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Connecting => write!(f, "connecting"),
            SessionState::Connected => write!(f, "connected"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

/// Why a connected session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The operator typed the escape byte.
    Escape,
    /// The remote peer closed the connection.
    RemoteClosed,
    /// Operator input ran out.
    ConsoleClosed,
}

/// Interactive bridge between the operator console and a remote telnet peer.
pub struct TelnetSession<S = TcpStream> {
    state: SessionState,
    remote: S,
    negotiator: Negotiator,
}

impl TelnetSession<TcpStream> {
    /// Resolve `host` and open a TCP connection to it.
    ///
    /// This call is the `Connecting` state: a session value only exists once
    /// the connection is up, so it starts `Connected`. A failed attempt
    /// returns the error and no session, which leaves nothing to close.
    /// Without a timeout this waits as long as the operating system does.
    pub async fn connect(
        host: &str,
        port: u16,
        timeout: Option<Duration>,
    ) -> Result<Self, TelnetError> {
        debug!("telnet {}:{} {}", host, port, SessionState::Connecting);
        let attempt = open_stream(host, port);
        let stream = match timeout {
            Some(limit) => tokio::time::timeout(limit, attempt)
                .await
                .map_err(|_| TelnetError::Timeout(limit))??,
            None => attempt.await?,
        };
        info!("telnet connected to {}:{}", host, port);
        Ok(Self::from_stream(stream))
    }
}

impl<S> TelnetSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an already connected stream.
    pub fn from_stream(remote: S) -> Self {
        Self {
            state: SessionState::Connected,
            remote,
            negotiator: Negotiator::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Shuttle bytes until the operator escapes or either side closes.
    ///
    /// Operator input always goes out before the remote is read again, and
    /// negotiation replies are written before the next round.
    pub async fn run<W: Write>(
        &mut self,
        console: &mut Console,
        display: &mut W,
    ) -> Result<CloseReason, TelnetError> {
        if self.state != SessionState::Connected {
            return Ok(CloseReason::RemoteClosed);
        }
        let outcome = self.pump(console, display).await;
        if let Err(err) = self.remote.shutdown().await {
            debug!("telnet shutdown: {err}");
        }
        self.transition(SessionState::Closed);
        outcome
    }

    async fn pump<W: Write>(
        &mut self,
        console: &mut Console,
        display: &mut W,
    ) -> Result<CloseReason, TelnetError> {
        let (mut reader, mut writer) = tokio::io::split(&mut self.remote);
        let mut buf = [0u8; RECV_BUFFER];
        let reason = loop {
            tokio::select! {
                biased;
                line = console.next_line() => match line {
                    Some(mut line) => {
                        if line.first() == Some(&ESCAPE) {
                            break CloseReason::Escape;
                        }
                        line.push(b'\r');
                        writer.write_all(&line).await?;
                    }
                    None => break CloseReason::ConsoleClosed,
                },
                read = reader.read(&mut buf) => {
                    let n = read?;
                    if n == 0 {
                        break CloseReason::RemoteClosed;
                    }
                    match self.negotiator.receive(&buf[..n]) {
                        Action::Display(text) => {
                            display.write_all(&text)?;
                            display.flush()?;
                        }
                        Action::Reply(reply) => {
                            writer.write_all(&reply).await?;
                            writer.flush().await?;
                        }
                        Action::Wait => {}
                    }
                }
            }
        };
        debug!("telnet loop finished: {:?}", reason);
        Ok(reason)
    }

    fn transition(&mut self, next: SessionState) {
        debug!("telnet session {} -> {}", self.state, next);
        self.state = next;
    }
}

async fn open_stream(host: &str, port: u16) -> Result<TcpStream, TelnetError> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|source| TelnetError::Resolve {
            host: host.to_string(),
            source,
        })?
        .collect();
    let mut last_err = io::Error::new(io::ErrorKind::NotFound, "no addresses resolved");
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(err) => {
                warn!("telnet connect to {addr} failed: {err}");
                last_err = err;
            }
        }
    }
    Err(TelnetError::Connect {
        host: host.to_string(),
        port,
        source: last_err,
    })
}
