//! The card punch station: reads operator lines and runs the matching command.

use std::io::Write;

use anyhow::{Context, Result};
use log::{debug, warn};

use crate::card::CARD_WIDTH;
use crate::command::{self, Command};
use crate::config::StationConfig;
use crate::console::Console;
use crate::deck::CardDeck;
use crate::submit::Submitter;
use crate::telnet::{CloseReason, TelnetSession};

pub const BANNER: &str = "Sim 029 Card Punch. Type .help for commands";

/// Column guide printed at startup and by `.ruler`.
pub const RULER: &str = concat!(
    "0        1         2         3         4         5         6         7         8\n",
    "12345678901234567890123456789012345678901234567890123456789012345678901234567890\n",
);

pub const HELP: &str = "
Commands:
.quit/.q               Exit.
.help                  Show this list.
.save [filename]       Save the card deck to a named file.
.load [filename]       Replace the card deck with the lines of a file.
.submit                Send the deck to the TCP card reader.
.repl [card #]         Replace an existing card. You will be prompted for the new one.
.new                   Clear the card deck.
.list                  Show a numbered list of cards.
.del                   Delete the last card in the deck.
.ruler                 Display column numbers.
.telnet [host] [port]  Telnet to a host (port 23 if omitted).

";

/// Whether the station keeps reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Operator session state: the deck, the remembered reader address and the console.
pub struct Station<W: Write> {
    deck: CardDeck,
    config: StationConfig,
    submitter: Submitter,
    submit_address: String,
    console: Console,
    out: W,
}

impl<W: Write> Station<W> {
    pub fn new(config: StationConfig, console: Console, out: W) -> Result<Self> {
        let deck = CardDeck::with_layout(config.deck_layout())
            .context("failed to allocate the initial card deck")?;
        debug!("card deck layout {:?}", deck.layout());
        Ok(Self {
            deck,
            submitter: Submitter::new(config.submit_port),
            submit_address: config.submit_host.clone(),
            config,
            console,
            out,
        })
    }

    pub fn deck(&self) -> &CardDeck {
        &self.deck
    }

    /// Reader address offered at the next `.submit` prompt.
    pub fn submit_address(&self) -> &str {
        &self.submit_address
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Print the banner and process lines until `.quit` or end of input.
    ///
    /// Returns an error only for conditions that end the station: a deck
    /// that ran out of memory while loading, or a broken operator terminal.
    pub async fn run(&mut self) -> Result<()> {
        writeln!(self.out, "{}\n", BANNER)?;
        write!(self.out, "{}", RULER)?;
        self.out.flush()?;
        while let Some(line) = self.console.next_line().await {
            if self.dispatch(&line).await? == Flow::Quit {
                break;
            }
            self.out.flush()?;
        }
        self.out.flush()?;
        Ok(())
    }

    /// Run a single line of operator input.
    pub async fn dispatch(&mut self, line: &[u8]) -> Result<Flow> {
        let command = match command::parse(line) {
            Ok(command) => command,
            Err(err) => {
                writeln!(self.out, "{}", err)?;
                return Ok(Flow::Continue);
            }
        };
        debug!("dispatch {:?}", command);
        match command {
            Command::Quit => return Ok(Flow::Quit),
            Command::Help => write!(self.out, "{}", HELP)?,
            Command::Ruler => write!(self.out, "{}", RULER)?,
            Command::New => {
                self.deck.clear();
                writeln!(self.out, "Card deck cleared")?;
            }
            Command::Delete => self.deck.delete_last(),
            Command::List => self.list()?,
            Command::Save(path) => match self.deck.save(&path) {
                Ok(_) => writeln!(self.out, "File {} saved", path.display())?,
                Err(err) => writeln!(self.out, "{}", err)?,
            },
            Command::Load(path) => match self.deck.load(&path) {
                Ok(count) => writeln!(
                    self.out,
                    "File {} loaded, {} cards read",
                    path.display(),
                    count
                )?,
                Err(err) if err.is_fatal() => {
                    writeln!(self.out, "{}", err)?;
                    self.out.flush()?;
                    return Err(err)
                        .with_context(|| format!("loading {} failed", path.display()));
                }
                Err(err) => writeln!(self.out, "{}", err)?,
            },
            Command::Replace(index) => return self.replace(index).await,
            Command::Submit => self.submit().await?,
            Command::Telnet { host, port } => self.telnet(&host, port).await?,
            Command::Card(text) => {
                if let Err(err) = self.deck.append(&text) {
                    warn!("{}", err);
                    writeln!(self.out, "{}", err)?;
                }
            }
        }
        Ok(Flow::Continue)
    }

    fn list(&mut self) -> Result<()> {
        for (index, text) in self.deck.list() {
            write!(self.out, "[{:04}]", index)?;
            self.out.write_all(text)?;
            writeln!(self.out)?;
        }
        Ok(())
    }

    async fn replace(&mut self, index: usize) -> Result<Flow> {
        if index == 0 || index > self.deck.len() {
            writeln!(self.out, "Bad linenumber {}", index)?;
            return Ok(Flow::Continue);
        }
        write!(self.out, "Enter new line:")?;
        self.out.flush()?;
        let Some(line) = self.console.next_line().await else {
            return Ok(Flow::Quit);
        };
        let text = &line[..line.len().min(CARD_WIDTH)];
        match self.deck.replace_at(index, text) {
            Ok(()) => writeln!(self.out, "Card replaced")?,
            Err(err) => writeln!(self.out, "{}", err)?,
        }
        Ok(Flow::Continue)
    }

    async fn submit(&mut self) -> Result<()> {
        let outcome = self
            .submitter
            .submit(
                &self.deck,
                &self.submit_address,
                &mut self.console,
                &mut self.out,
            )
            .await;
        match outcome {
            Ok(report) => {
                self.submit_address = report.address;
                writeln!(self.out, "{} cards submitted", report.sent)?;
            }
            Err(err) => {
                if let Some(address) = err.address() {
                    self.submit_address = address.to_string();
                }
                warn!("submit failed: {:?}", err);
                writeln!(self.out, "{}", err)?;
            }
        }
        Ok(())
    }

    async fn telnet(&mut self, host: &str, port: u16) -> Result<()> {
        let mut session =
            match TelnetSession::connect(host, port, self.config.connect_timeout()).await {
                Ok(session) => session,
                Err(err) => {
                    warn!("telnet to {}:{} failed: {:?}", host, port, err);
                    writeln!(self.out, "{}", err)?;
                    return Ok(());
                }
            };
        writeln!(self.out, "Connected. Type ^] <enter> to exit\n")?;
        self.out.flush()?;
        match session.run(&mut self.console, &mut self.out).await {
            Ok(CloseReason::RemoteClosed) => {
                writeln!(self.out, "\nConnection closed by foreign host.")?
            }
            Ok(_) => {}
            Err(err) => writeln!(self.out, "\n{}", err)?,
        }
        writeln!(self.out, "Exiting connection")?;
        Ok(())
    }
}
