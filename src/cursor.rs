//! Streaming cursors over the compressed word array.
//!
//! A cursor turns the word array into a stream of *events*: either a
//! literal (one 31-bit block) or a run of identical blocks with a
//! remaining count. Outside WAH mode, a sequence that carries a flip bit
//! is split into two events (the first block as a literal, then the
//! uniform remainder as a pure run) so consumers never have to reason
//! about the flip field themselves. The reverse cursor emits the same
//! events back to front, which puts the flip block last.

use crate::concise::ConciseSet;
use crate::words;

/// Forward cursor, least-significant word first.
pub(crate) struct WordCursor<'a> {
    words: &'a [u32],
    wah: bool,
    index: usize,
    /// Image of the current event: a literal, or a sequence word whose
    /// type bit tells the run polarity.
    pub(crate) word: u32,
    /// True when the current event is a single 31-bit literal block.
    pub(crate) is_literal: bool,
    /// Blocks remaining in the current event (1 for literals).
    pub(crate) count: u32,
}

impl<'a> WordCursor<'a> {
    pub(crate) fn new(set: &'a ConciseSet) -> Self {
        let mut cursor = WordCursor {
            words: set.words(),
            wah: set.is_wah_mode(),
            index: 0,
            word: 0,
            is_literal: false,
            count: 0,
        };
        cursor.load();
        cursor
    }

    pub(crate) fn exhausted(&self) -> bool {
        self.index >= self.words.len()
    }

    fn load(&mut self) -> bool {
        if self.exhausted() {
            return false;
        }
        let w = self.words[self.index];
        if words::is_literal(w) {
            self.is_literal = true;
            self.word = w;
            self.count = 1;
        } else {
            self.count = words::sequence_count(w) + 1;
            if !self.wah && !words::is_sequence_with_no_bits(w) {
                self.is_literal = true;
                self.word = words::first_block_literal(w, false);
            } else {
                self.is_literal = false;
                self.word = w;
            }
        }
        true
    }

    /// Move to the next event. Returns `false` once the words are drained.
    pub(crate) fn advance(&mut self) -> bool {
        if !self.wah && self.is_literal && self.count > 1 {
            // Leaving the flip block of a sequence: the uniform tail
            // becomes the current event.
            self.count -= 1;
            self.is_literal = false;
            self.word = words::sequence_with_no_bits(self.words[self.index]) - 1;
            return true;
        }
        self.index += 1;
        self.load()
    }

    /// Consume `blocks` blocks of the current fill event.
    pub(crate) fn advance_by(&mut self, blocks: u32) -> bool {
        debug_assert!(blocks <= self.count);
        self.count -= blocks;
        if self.count == 0 {
            return self.advance();
        }
        true
    }

    /// The literal every block of the current fill event expands to.
    #[inline]
    pub(crate) fn fill_block_literal(&self) -> u32 {
        debug_assert!(!self.is_literal);
        words::ALL_ZEROS_LITERAL | (((self.word << 1) as i32 >> 31) as u32)
    }

    /// The literal image of the current event's block.
    #[inline]
    pub(crate) fn block_literal(&self) -> u32 {
        if self.is_literal {
            self.word
        } else {
            self.fill_block_literal()
        }
    }

    /// Append every remaining event to `res` and stamp the source's
    /// maximum element. Returns `false` when there was nothing left.
    pub(crate) fn flush_into(&mut self, res: &mut ConciseSet, source_last: u32) -> bool {
        if self.exhausted() {
            return false;
        }
        loop {
            if self.is_literal {
                res.append_literal(self.word);
                if !self.advance() {
                    break;
                }
            } else {
                let count = self.count;
                res.append_fill(count, self.word);
                if !self.advance_by(count) {
                    break;
                }
            }
        }
        res.set_last(source_last);
        true
    }
}

/// Reverse cursor, most-significant word first.
pub(crate) struct ReverseWordCursor<'a> {
    words: &'a [u32],
    wah: bool,
    /// `words[pos - 1]` is the current word; 0 means exhausted.
    pos: usize,
    pub(crate) word: u32,
    pub(crate) is_literal: bool,
    pub(crate) count: u32,
}

impl<'a> ReverseWordCursor<'a> {
    pub(crate) fn new(set: &'a ConciseSet) -> Self {
        let mut cursor = ReverseWordCursor {
            words: set.words(),
            wah: set.is_wah_mode(),
            pos: set.words().len(),
            word: 0,
            is_literal: false,
            count: 0,
        };
        cursor.load();
        cursor
    }

    fn load(&mut self) -> bool {
        if self.pos == 0 {
            return false;
        }
        let w = self.words[self.pos - 1];
        if words::is_literal(w) {
            self.is_literal = true;
            self.word = w;
            self.count = 1;
            return true;
        }
        let blocks = words::sequence_count(w) + 1;
        if self.wah || words::is_sequence_with_no_bits(w) {
            self.is_literal = false;
            self.word = w;
            self.count = blocks;
        } else if blocks > 1 {
            // Traversing backwards the uniform tail comes first; the flip
            // block is produced by the retreat that drains it.
            self.is_literal = false;
            self.word = words::sequence_with_no_bits(w);
            self.count = blocks - 1;
        } else {
            self.is_literal = true;
            self.word = words::first_block_literal(w, false);
            self.count = 1;
        }
        true
    }

    /// Move to the previous event. Returns `false` once drained.
    pub(crate) fn retreat(&mut self) -> bool {
        if !self.is_literal && self.pos > 0 {
            let w = self.words[self.pos - 1];
            if !self.wah && !words::is_literal(w) && !words::is_sequence_with_no_bits(w) {
                // The tail of a flip sequence is drained: its first block
                // is still pending.
                self.is_literal = true;
                self.word = words::first_block_literal(w, false);
                self.count = 1;
                return true;
            }
        }
        if self.pos == 0 {
            return false;
        }
        self.pos -= 1;
        self.load()
    }

    /// Consume `blocks` blocks of the current fill event, downwards.
    pub(crate) fn retreat_by(&mut self, blocks: u32) -> bool {
        debug_assert!(blocks <= self.count);
        self.count -= blocks;
        if self.count == 0 {
            return self.retreat();
        }
        true
    }

    #[inline]
    pub(crate) fn fill_block_literal(&self) -> u32 {
        debug_assert!(!self.is_literal);
        words::ALL_ZEROS_LITERAL | (((self.word << 1) as i32 >> 31) as u32)
    }

    #[inline]
    pub(crate) fn block_literal(&self) -> u32 {
        if self.is_literal {
            self.word
        } else {
            self.fill_block_literal()
        }
    }

    pub(crate) fn exhausted(&self) -> bool {
        self.pos == 0
    }
}
