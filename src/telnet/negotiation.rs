//! The handful of telnet (RFC 854) command bytes the station understands.
//!
//! Option handling is a fixed table, evaluated fresh for every chunk the
//! remote sends. Nothing is remembered between chunks: a server that asks
//! twice gets the same answer twice. Window size is the only option the
//! station agrees to; every other `DO` is refused with `WONT` and every
//! `WILL` is answered with `DO`.

/// Interpret as command.
pub const IAC: u8 = 255;
pub const DONT: u8 = 254;
pub const DO: u8 = 253;
pub const WONT: u8 = 252;
pub const WILL: u8 = 251;
/// Subnegotiation begin.
pub const SB: u8 = 250;
/// Subnegotiation end.
pub const SE: u8 = 240;
/// Negotiate about window size (RFC 1073).
pub const NAWS: u8 = 31;

/// Ctrl-] typed by the operator ends the session.
pub const ESCAPE: u8 = 0x1d;
pub const DEFAULT_PORT: u16 = 23;

pub const WINDOW_WIDTH: u16 = 80;
pub const WINDOW_HEIGHT: u16 = 24;

/// Response chosen for a `(command, option)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Agree to NAWS and declare an 80x24 window.
    ReportWindowSize,
    /// `DO x` is answered with `WONT x`.
    Refuse,
    /// `WILL x` is answered with `DO x`.
    Downgrade,
    /// Anything else is sent back through the same byte rewrite.
    Echo,
}

pub fn policy_for(command: u8, option: u8) -> Policy {
    match (command, option) {
        (DO, NAWS) => Policy::ReportWindowSize,
        (DO, _) => Policy::Refuse,
        (WILL, _) => Policy::Downgrade,
        _ => Policy::Echo,
    }
}

/// What the session should do with bytes read from the remote side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Plain data for the operator's screen.
    Display(Vec<u8>),
    /// Bytes to write back to the remote peer.
    Reply(Vec<u8>),
    /// An incomplete command was held back until more bytes arrive.
    Wait,
}

/// Classifies remote chunks into display data and negotiation replies.
///
/// A chunk is a negotiation only when it starts with [`IAC`]. The command
/// and option bytes are read only once three bytes are present; a shorter
/// IAC-led fragment is kept and prefixed to the next chunk.
#[derive(Debug, Default)]
pub struct Negotiator {
    pending: Vec<u8>,
}

impl Negotiator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn receive(&mut self, data: &[u8]) -> Action {
        let mut chunk = std::mem::take(&mut self.pending);
        chunk.extend_from_slice(data);

        if chunk.first() != Some(&IAC) {
            return Action::Display(chunk);
        }
        if chunk.len() < 3 {
            self.pending = chunk;
            return Action::Wait;
        }

        let (command, option) = (chunk[1], chunk[2]);
        let policy = policy_for(command, option);
        log::debug!(
            "IAC {} {} -> {:?}",
            command_name(command),
            option,
            policy
        );
        match policy {
            Policy::ReportWindowSize => Action::Reply(window_size_reply()),
            Policy::Refuse | Policy::Downgrade | Policy::Echo => {
                Action::Reply(refuse_all(&chunk))
            }
        }
    }

    /// Bytes held back waiting for the rest of a command.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }
}

/// `IAC WILL NAWS` followed by the 80x24 window subnegotiation.
pub fn window_size_reply() -> Vec<u8> {
    let mut reply = vec![IAC, WILL, NAWS, IAC, SB, NAWS];
    reply.extend_from_slice(&WINDOW_WIDTH.to_be_bytes());
    reply.extend_from_slice(&WINDOW_HEIGHT.to_be_bytes());
    reply.extend_from_slice(&[IAC, SE]);
    reply
}

/// Rewrite every `DO` to `WONT` and every `WILL` to `DO` across the whole chunk.
pub fn refuse_all(chunk: &[u8]) -> Vec<u8> {
    chunk
        .iter()
        .map(|&b| match b {
            DO => WONT,
            WILL => DO,
            other => other,
        })
        .collect()
}

pub fn command_name(byte: u8) -> &'static str {
    match byte {
        IAC => "IAC",
        DONT => "DONT",
        DO => "DO",
        WONT => "WONT",
        WILL => "WILL",
        SB => "SB",
        SE => "SE",
        _ => "?",
    }
}
