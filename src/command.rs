//! Operator line parsing.
//!
//! A line starting with a recognised dot-command is a command; every other
//! line, unknown dot-words included, is punched as a card. Command names are
//! case-insensitive and matched on the first whitespace-delimited word.

use std::path::PathBuf;

use thiserror::Error;

use crate::card::CARD_WIDTH;
use crate::telnet::negotiation::DEFAULT_PORT;

/// Longest file name or host name accepted as a command argument.
pub const MAX_ARG_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    Help,
    Save(PathBuf),
    Load(PathBuf),
    Submit,
    Replace(usize),
    New,
    List,
    Delete,
    Ruler,
    Telnet { host: String, port: u16 },
    /// Text to punch, already cut to one card.
    Card(Vec<u8>),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("{command} needs a {what}")]
    MissingArgument {
        command: &'static str,
        what: &'static str,
    },
    #[error("{what} longer than {max} bytes")]
    ArgumentTooLong { what: &'static str, max: usize },
    #[error("Bad linenumber {0}")]
    BadCardNumber(String),
    #[error("Bad port {0}")]
    BadPort(String),
}

/// Classify one line of operator input.
pub fn parse(line: &[u8]) -> Result<Command, CommandError> {
    if line.first() != Some(&b'.') {
        return Ok(card(line));
    }
    let text = String::from_utf8_lossy(line);
    let mut words = text.split_whitespace();
    let name = words.next().unwrap_or_default().to_ascii_uppercase();
    let command = match name.as_str() {
        ".Q" | ".QUIT" => Command::Quit,
        ".HELP" => Command::Help,
        ".SAVE" => Command::Save(path_arg(words.next(), ".save")?),
        ".LOAD" => Command::Load(path_arg(words.next(), ".load")?),
        ".SUBMIT" => Command::Submit,
        ".REPL" => Command::Replace(card_number(words.next())?),
        ".NEW" => Command::New,
        ".LIST" => Command::List,
        ".DEL" => Command::Delete,
        ".RULER" => Command::Ruler,
        ".TELNET" => {
            let host = bounded(
                words.next().ok_or(CommandError::MissingArgument {
                    command: ".telnet",
                    what: "host",
                })?,
                "host",
            )?;
            let port = match words.next() {
                Some(raw) => parse_port(raw)?,
                None => DEFAULT_PORT,
            };
            Command::Telnet {
                host: host.to_string(),
                port,
            }
        }
        _ => card(line),
    };
    Ok(command)
}

fn card(line: &[u8]) -> Command {
    Command::Card(line[..line.len().min(CARD_WIDTH)].to_vec())
}

fn bounded<'a>(raw: &'a str, what: &'static str) -> Result<&'a str, CommandError> {
    if raw.len() > MAX_ARG_LEN {
        return Err(CommandError::ArgumentTooLong {
            what,
            max: MAX_ARG_LEN,
        });
    }
    Ok(raw)
}

fn path_arg(raw: Option<&str>, command: &'static str) -> Result<PathBuf, CommandError> {
    let raw = raw.ok_or(CommandError::MissingArgument {
        command,
        what: "filename",
    })?;
    Ok(PathBuf::from(bounded(raw, "filename")?))
}

fn card_number(raw: Option<&str>) -> Result<usize, CommandError> {
    let raw = raw.ok_or(CommandError::MissingArgument {
        command: ".repl",
        what: "card number",
    })?;
    raw.parse()
        .map_err(|_| CommandError::BadCardNumber(raw.chars().take(16).collect()))
}

fn parse_port(raw: &str) -> Result<u16, CommandError> {
    match raw.parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(CommandError::BadPort(raw.chars().take(16).collect())),
    }
}
