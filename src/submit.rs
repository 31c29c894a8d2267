//! One-shot transmission of a deck to a TCP card reader.
//!
//! The reader gets a raw byte stream: each card's text, including its own
//! newline when it has one, written with one call per card. There is no
//! framing, acknowledgment or retry.

use std::io::{self, Write};

use log::{debug, info};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::console::Console;
use crate::deck::CardDeck;

/// Longest host name or address accepted at the prompt.
pub const MAX_ADDRESS_LEN: usize = 253;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Card deck empty")]
    EmptyDeck,
    #[error("no address entered")]
    NoInput,
    #[error("Bad address {0}")]
    InvalidAddress(String),
    #[error("error connecting to server {address}:{port}")]
    Connect {
        address: String,
        port: u16,
        #[source]
        source: io::Error,
    },
    #[error("error sending card {card} to {address}")]
    Send {
        address: String,
        card: usize,
        #[source]
        source: io::Error,
    },
    #[error("console error")]
    Console(#[from] io::Error),
}

impl SubmitError {
    /// Address the operator chose before the failure, if one was chosen.
    pub fn address(&self) -> Option<&str> {
        match self {
            SubmitError::Connect { address, .. } | SubmitError::Send { address, .. } => {
                Some(address.as_str())
            }
            _ => None,
        }
    }
}

/// Result of a completed submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReport {
    pub sent: usize,
    /// Address used, to be offered as the default next time.
    pub address: String,
}

#[derive(Debug, Clone, Copy)]
pub struct Submitter {
    port: u16,
}

impl Submitter {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    /// Ask for the reader address and stream the deck to it.
    ///
    /// An empty reply keeps `default_address`. The address actually used is
    /// returned in the report so the caller can offer it next time.
    pub async fn submit<W: Write>(
        &self,
        deck: &CardDeck,
        default_address: &str,
        console: &mut Console,
        out: &mut W,
    ) -> Result<SubmitReport, SubmitError> {
        if deck.is_empty() {
            return Err(SubmitError::EmptyDeck);
        }
        write!(out, "IP ADDRESS? [{}]: ", default_address)?;
        out.flush()?;
        let reply = console.next_line().await.ok_or(SubmitError::NoInput)?;
        let address = parse_address_reply(&reply, default_address)?;
        let sent = self.send(deck, &address).await?;
        Ok(SubmitReport { sent, address })
    }

    /// Stream every active card to `address` over a single connection.
    pub async fn send(&self, deck: &CardDeck, address: &str) -> Result<usize, SubmitError> {
        let mut stream = TcpStream::connect((address, self.port))
            .await
            .map_err(|source| SubmitError::Connect {
                address: address.to_string(),
                port: self.port,
                source,
            })?;
        debug!("submitting {} cards to {}:{}", deck.len(), address, self.port);
        for (idx, card) in deck.cards().iter().enumerate() {
            stream
                .write_all(card.wire_bytes())
                .await
                .map_err(|source| SubmitError::Send {
                    address: address.to_string(),
                    card: idx + 1,
                    source,
                })?;
        }
        if let Err(err) = stream.shutdown().await {
            debug!("submit shutdown: {err}");
        }
        info!("submitted {} cards to {}:{}", deck.len(), address, self.port);
        Ok(deck.len())
    }
}

/// Turn the operator's reply into an address, falling back to the default on an empty line.
pub fn parse_address_reply(reply: &[u8], default_address: &str) -> Result<String, SubmitError> {
    let text = String::from_utf8_lossy(reply);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(default_address.to_string());
    }
    if trimmed.len() > MAX_ADDRESS_LEN
        || trimmed.chars().any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(SubmitError::InvalidAddress(
            trimmed.chars().take(32).collect(),
        ));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_reply_keeps_default() {
        assert_eq!(
            parse_address_reply(b"\n", "192.168.0.133").unwrap(),
            "192.168.0.133"
        );
    }

    #[test]
    fn new_reply_replaces_default() {
        assert_eq!(
            parse_address_reply(b" 10.1.1.9 \n", "192.168.0.133").unwrap(),
            "10.1.1.9"
        );
    }

    #[test]
    fn oversized_or_spaced_reply_is_rejected() {
        let long = "a".repeat(MAX_ADDRESS_LEN + 1);
        assert!(matches!(
            parse_address_reply(long.as_bytes(), "h"),
            Err(SubmitError::InvalidAddress(_))
        ));
        assert!(matches!(
            parse_address_reply(b"10.0.0.1 10.0.0.2\n", "h"),
            Err(SubmitError::InvalidAddress(_))
        ));
    }

    #[tokio::test]
    async fn empty_deck_is_not_submitted() {
        let (_tx, mut console) = Console::channel();
        let mut out = Vec::new();
        let err = Submitter::new(3505)
            .submit(&CardDeck::new(), "127.0.0.1", &mut console, &mut out)
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::EmptyDeck));
        assert!(out.is_empty());
    }
}
