//! Operator keyboard input.
//!
//! Standard input is read by exactly one background task and handed out as
//! line chunks over a channel. The dispatcher, the submit prompt and the
//! telnet session all pull from the same [`Console`], so leaving a telnet
//! session never leaves a stray read pending on stdin.

use std::io;

use log::{debug, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

const CONSOLE_BUFFER: usize = 64;
/// Longest line handed out, newline excluded. The rest of a longer line is discarded.
pub const MAX_LINE: usize = 1024;

/// Source of operator input, one line (newline included) per chunk.
#[derive(Debug)]
pub struct Console {
    rx: mpsc::Receiver<Vec<u8>>,
}

impl Console {
    /// Create a console fed by hand, returning the feeding end.
    pub fn channel() -> (mpsc::Sender<Vec<u8>>, Self) {
        let (tx, rx) = mpsc::channel(CONSOLE_BUFFER);
        (tx, Self { rx })
    }

    /// Start reading process stdin on a background task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn stdin() -> Self {
        Self::spawn_reader(tokio::io::stdin())
    }

    /// Start reading an arbitrary byte stream line by line.
    pub fn spawn_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, console) = Self::channel();
        tokio::spawn(async move {
            let mut reader = BufReader::new(reader);
            loop {
                let mut line = Vec::new();
                match read_bounded_line(&mut reader, &mut line).await {
                    Ok(0) => {
                        debug!("console input closed");
                        break;
                    }
                    Ok(_) => {
                        if tx.send(line).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!("console read failed: {err}");
                        break;
                    }
                }
            }
        });
        console
    }

    /// Wait for the next line. `None` once input is exhausted.
    pub async fn next_line(&mut self) -> Option<Vec<u8>> {
        self.rx.recv().await
    }
}

async fn read_bounded_line<R>(reader: &mut R, line: &mut Vec<u8>) -> io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut consumed = 0;
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(consumed);
        }
        let (text, used, done) = match available.iter().position(|&b| b == b'\n') {
            Some(pos) => (&available[..pos], pos + 1, true),
            None => (available, available.len(), false),
        };
        let room = MAX_LINE.saturating_sub(line.len());
        line.extend_from_slice(&text[..text.len().min(room)]);
        if done {
            line.push(b'\n');
        }
        reader.consume(used);
        consumed += used;
        if done {
            return Ok(consumed);
        }
    }
}
