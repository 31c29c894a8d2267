use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};
use thiserror::Error;

use crate::card::{CARD_WIDTH, Card};

/// Slots allocated when the station starts.
pub const DEFAULT_INITIAL_CARDS: usize = 100;
/// Slots added every time the deck fills up.
pub const DEFAULT_GROWTH_STEP: usize = 10;

/// Operation that asked the deck to grow.
///
/// Running out of memory while the operator is typing is survivable, so the
/// append path only reports it. Running out while a file is being loaded
/// leaves the deck half read, and the station treats that as fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthContext {
    Append,
    Load,
}

impl fmt::Display for GrowthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrowthContext::Append => write!(f, "append"),
            GrowthContext::Load => write!(f, "load"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DeckError {
    #[error("Bad linenumber {index}")]
    IndexOutOfRange { index: usize, count: usize },
    #[error("Error opening file {}", path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Error creating file {}", path.display())]
    FileCreate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("i/o error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Memory full (could not grow deck to {requested} cards during {context})")]
    AllocationFailure {
        context: GrowthContext,
        requested: usize,
    },
}

impl DeckError {
    /// Whether the station must stop after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DeckError::AllocationFailure {
                context: GrowthContext::Load,
                ..
            }
        )
    }
}

/// Sizing policy for a [`CardDeck`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeckLayout {
    pub initial_cards: usize,
    pub growth_step: usize,
    /// Hard ceiling on slots; growing past it counts as an allocation failure.
    pub max_cards: Option<usize>,
}

impl Default for DeckLayout {
    fn default() -> Self {
        Self {
            initial_cards: DEFAULT_INITIAL_CARDS,
            growth_step: DEFAULT_GROWTH_STEP,
            max_cards: None,
        }
    }
}

/// In-memory card deck: a run of fixed-width slots, the first `count` of which hold cards.
///
/// `count <= capacity` holds at every observable point. Capacity starts at
/// [`DeckLayout::initial_cards`] and only ever grows by
/// [`DeckLayout::growth_step`], and only when an append or loaded line makes
/// `count` reach it.
#[derive(Debug, Clone)]
pub struct CardDeck {
    slots: Vec<Card>,
    count: usize,
    layout: DeckLayout,
}

impl CardDeck {
    /// Create an empty deck with the default 100-slot layout.
    pub fn new() -> Self {
        let layout = DeckLayout::default();
        Self {
            slots: vec![Card::blank(); layout.initial_cards],
            count: 0,
            layout,
        }
    }

    /// Create an empty deck, failing if the initial slots cannot be allocated.
    pub fn with_layout(layout: DeckLayout) -> Result<Self, DeckError> {
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(layout.initial_cards)
            .map_err(|_| DeckError::AllocationFailure {
                context: GrowthContext::Append,
                requested: layout.initial_cards,
            })?;
        slots.resize(layout.initial_cards, Card::blank());
        Ok(Self {
            slots,
            count: 0,
            layout,
        })
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn layout(&self) -> DeckLayout {
        self.layout
    }

    /// Active cards in deck order.
    pub fn cards(&self) -> &[Card] {
        &self.slots[..self.count]
    }

    /// Card at a 1-based operator index.
    pub fn get(&self, index: usize) -> Option<&Card> {
        index.checked_sub(1).and_then(|idx| self.cards().get(idx))
    }

    /// Raw slot access including the cleared area past `len()`.
    pub fn slot(&self, idx: usize) -> Option<&Card> {
        self.slots.get(idx)
    }

    /// Punch a new card at the end of the deck.
    ///
    /// When the deck fills up it grows by one step. If that growth fails the
    /// card is still kept and `AllocationFailure` is returned for the
    /// operator to see. A line typed while the deck is still full from an
    /// earlier failure retries the growth first and is dropped if it fails
    /// again.
    pub fn append(&mut self, line: &[u8]) -> Result<(), DeckError> {
        self.push(line, GrowthContext::Append)
    }

    /// Overwrite the card at a 1-based index.
    pub fn replace_at(&mut self, index: usize, line: &[u8]) -> Result<(), DeckError> {
        if index == 0 || index > self.count {
            return Err(DeckError::IndexOutOfRange {
                index,
                count: self.count,
            });
        }
        self.slots[index - 1] = Card::from_bytes(line);
        Ok(())
    }

    /// Drop the last card. Does nothing on an empty deck.
    pub fn delete_last(&mut self) {
        if self.count == 0 {
            return;
        }
        self.count -= 1;
        self.slots[self.count].zero();
    }

    /// Zero every slot and forget all cards. Capacity is kept.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.zero();
        }
        self.count = 0;
    }

    /// Numbered listing of the active cards, rendered without their newline.
    ///
    /// The iterator is lazy and can be cloned to walk the deck again.
    pub fn list(&self) -> impl Iterator<Item = (usize, &[u8])> + Clone + '_ {
        self.cards()
            .iter()
            .enumerate()
            .map(|(idx, card)| (idx + 1, card.rendered()))
    }

    /// Replace the deck with the lines of a text file.
    ///
    /// The deck is cleared before the file is opened, so a missing file
    /// leaves it empty. Lines longer than 80 bytes lose the excess. A final
    /// line without a newline still becomes a card. Returns the number of
    /// cards read.
    pub fn load(&mut self, path: &Path) -> Result<usize, DeckError> {
        self.clear();
        let file = OpenOptions::new()
            .read(true)
            .open(path)
            .map_err(|source| DeckError::FileOpen {
                path: path.to_path_buf(),
                source,
            })?;
        let mut reader = BufReader::new(file);
        let mut line = Vec::new();
        loop {
            line.clear();
            let read = read_card_line(&mut reader, &mut line).map_err(|source| DeckError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            if read == 0 {
                break;
            }
            self.push(&line, GrowthContext::Load)?;
        }
        info!("loaded {} cards from {}", self.count, path.display());
        Ok(self.count)
    }

    /// Write every active card as one newline-terminated line.
    pub fn save(&self, path: &Path) -> Result<usize, DeckError> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|source| DeckError::FileCreate {
                path: path.to_path_buf(),
                source,
            })?;
        let io_err = |source| DeckError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut writer = BufWriter::new(file);
        for card in self.cards() {
            writer.write_all(card.rendered()).map_err(io_err)?;
            writer.write_all(b"\n").map_err(io_err)?;
        }
        writer.flush().map_err(io_err)?;
        info!("saved {} cards to {}", self.count, path.display());
        Ok(self.count)
    }

    fn push(&mut self, line: &[u8], context: GrowthContext) -> Result<(), DeckError> {
        if self.count == self.slots.len() {
            self.grow(context)?;
        }
        self.slots[self.count] = Card::from_bytes(line);
        self.count += 1;
        if self.count == self.slots.len() {
            self.grow(context)?;
        }
        Ok(())
    }

    fn grow(&mut self, context: GrowthContext) -> Result<(), DeckError> {
        let step = self.layout.growth_step;
        let requested = self.slots.len() + step;
        let failure = DeckError::AllocationFailure { context, requested };
        if step == 0 || self.layout.max_cards.is_some_and(|max| requested > max) {
            return Err(failure);
        }
        if self.slots.try_reserve_exact(step).is_err() {
            return Err(failure);
        }
        self.slots.resize(requested, Card::blank());
        debug!("deck grown to {} slots during {}", requested, context);
        Ok(())
    }
}

impl Default for CardDeck {
    fn default() -> Self {
        Self::new()
    }
}

/// Read one line into `line`, keeping at most one card's worth of text.
///
/// Bytes past column 80 are skipped as they arrive; the newline is kept.
/// Returns the number of bytes consumed, 0 at end of file.
fn read_card_line<R: BufRead>(reader: &mut R, line: &mut Vec<u8>) -> io::Result<usize> {
    let mut consumed = 0;
    loop {
        let available = reader.fill_buf()?;
        if available.is_empty() {
            return Ok(consumed);
        }
        let (text, used, done) = match available.iter().position(|&b| b == b'\n') {
            Some(pos) => (&available[..pos], pos + 1, true),
            None => (available, available.len(), false),
        };
        let room = CARD_WIDTH.saturating_sub(line.len());
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
