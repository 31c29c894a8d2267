use std::fmt;

/// Number of columns on an IBM 5081 card.
pub const CARD_WIDTH: usize = 80;

/// Single fixed-width card record.
///
/// A card holds exactly [`CARD_WIDTH`] bytes. Text shorter than the card is
/// padded with NUL bytes; a newline typed by the operator is kept as part of
/// the record and marks the end of the meaningful text.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Card {
    cols: [u8; CARD_WIDTH],
}

impl Card {
    /// An all-zero card, the state of every unused slot.
    pub const fn blank() -> Self {
        Self {
            cols: [0; CARD_WIDTH],
        }
    }

    /// Build a card from raw bytes, truncating at 80 columns and NUL padding the rest.
    pub fn from_bytes(line: &[u8]) -> Self {
        let mut cols = [0u8; CARD_WIDTH];
        let len = line.len().min(CARD_WIDTH);
        cols[..len].copy_from_slice(&line[..len]);
        Self { cols }
    }

    /// Offset of the first newline.
    ///
    /// A card without a newline is active up to its last non-NUL byte, so the
    /// trailing pad is dropped but a NUL inside the text is kept.
    pub fn active_len(&self) -> usize {
        match self.cols.iter().position(|&b| b == b'\n') {
            Some(pos) => pos,
            None => self.cols.iter().rposition(|&b| b != 0).map_or(0, |pos| pos + 1),
        }
    }

    /// Text as shown by `.list` and written by `.save`, newline excluded.
    pub fn rendered(&self) -> &[u8] {
        &self.cols[..self.active_len()]
    }

    /// Bytes transmitted to the card reader: the rendered text plus the
    /// card's own newline when it carries one.
    pub fn wire_bytes(&self) -> &[u8] {
        let len = self.active_len();
        if len < CARD_WIDTH && self.cols[len] == b'\n' {
            &self.cols[..=len]
        } else {
            &self.cols[..len]
        }
    }

    pub fn is_blank(&self) -> bool {
        self.cols.iter().all(|&b| b == 0)
    }

    pub fn as_bytes(&self) -> &[u8; CARD_WIDTH] {
        &self.cols
    }

    pub(crate) fn zero(&mut self) {
        self.cols = [0; CARD_WIDTH];
    }
}

impl Default for Card {
    fn default() -> Self {
        Self::blank()
    }
}

impl fmt::Debug for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Card")
            .field(&String::from_utf8_lossy(self.rendered()))
            .finish()
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.rendered()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn short_line_is_padded_and_rendered_without_newline() {
        let card = Card::from_bytes(b"       PROGRAM HELLO\n");
        assert_eq!(card.rendered(), b"       PROGRAM HELLO");
        assert_eq!(card.wire_bytes(), b"       PROGRAM HELLO\n");
        assert_eq!(card.as_bytes()[CARD_WIDTH - 1], 0);
    }

    #[test]
    fn long_line_is_cut_at_column_80() {
        let line = "X".repeat(95);
        let card = Card::from_bytes(line.as_bytes());
        assert_eq!(card.active_len(), CARD_WIDTH);
        assert_eq!(card.rendered(), &line.as_bytes()[..CARD_WIDTH]);
        assert_eq!(card.wire_bytes().len(), CARD_WIDTH);
    }

    #[test]
    fn line_without_newline_stops_at_padding() {
        let card = Card::from_bytes(b"//JOB1 JOB");
        assert_eq!(card.rendered(), b"//JOB1 JOB");
        assert_eq!(card.wire_bytes(), b"//JOB1 JOB");
    }

    #[test]
    fn blank_card_renders_empty() {
        let card = Card::blank();
        assert!(card.is_blank());
        assert_eq!(card.rendered(), b"");
        assert_eq!(card.to_string(), "");
    }

    #[test]
    fn interior_nul_is_part_of_the_text() {
        let card = Card::from_bytes(b"AB\0CD\n");
        assert_eq!(card.rendered(), b"AB\0CD");
        assert_eq!(card.wire_bytes(), b"AB\0CD\n");

        let unterminated = Card::from_bytes(b"AB\0CD");
        assert_eq!(unterminated.rendered(), b"AB\0CD");
        assert_eq!(unterminated.wire_bytes(), b"AB\0CD");
    }

    #[test]
    fn text_after_newline_is_padding() {
        let card = Card::from_bytes(b"A\nB");
        assert_eq!(card.rendered(), b"A");
        assert_eq!(card.wire_bytes(), b"A\n");
    }
}
