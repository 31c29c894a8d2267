//! Core library for the 029 card punch station: the card deck, the card
//! reader submitter and the minimal telnet client.

pub mod card;
pub mod command;
pub mod config;
pub mod console;
pub mod deck;
pub mod station;
pub mod submit;
pub mod telnet;

pub use card::{CARD_WIDTH, Card};
pub use command::{Command, CommandError};
pub use config::{ConfigError, StationConfig};
pub use console::Console;
pub use deck::{CardDeck, DeckError, DeckLayout, GrowthContext};
pub use station::{Flow, Station};
pub use submit::{SubmitError, SubmitReport, Submitter};
pub use telnet::{CloseReason, SessionState, TelnetError, TelnetSession};
