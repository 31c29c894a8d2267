//! Minimal telnet client used by the `.telnet` command.
//!
//! * [`negotiation`] holds the protocol bytes and the fixed option policy.
//! * [`session`] owns the connection and the console/remote event loop.

pub mod negotiation;
pub mod session;

pub use negotiation::{Action, Negotiator, Policy, policy_for};
pub use session::{CloseReason, SessionState, TelnetError, TelnetSession};
