//! Iterators over the set bits of a [`ConciseSet`].
//!
//! Both directions ride a word cursor, so a run of empty blocks is
//! crossed in one subtraction instead of one step per block.
//! `skip_all_before` exposes the same jump to callers that merge several
//! sets by leapfrogging.

use crate::concise::ConciseSet;
use crate::cursor::{ReverseWordCursor, WordCursor};
use crate::words::{literal_bits, ALL_ZEROS_LITERAL, BLOCK_BITS};

/// Ascending iterator over the elements of a [`ConciseSet`].
pub struct Iter<'a> {
    cursor: WordCursor<'a>,
    set_last: u32,
    /// Absolute position where the current block starts.
    base: u32,
    /// Next in-block bit to examine, `0..=31`.
    next_bit: u32,
    done: bool,
}

impl<'a> Iter<'a> {
    pub(crate) fn new(set: &'a ConciseSet) -> Self {
        let done = set.is_empty();
        Iter {
            cursor: WordCursor::new(set),
            set_last: if done { 0 } else { set.last },
            base: 0,
            next_bit: 0,
            done,
        }
    }

    /// Skip every element smaller than `element`; the following `next`
    /// yields the least element `>= element`, if any.
    ///
    /// Whole runs are crossed in one step, so the cost is bounded by the
    /// number of compressed words, not by the distance skipped.
    pub fn skip_all_before(&mut self, element: u32) {
        if self.done || element <= self.base + self.next_bit {
            return;
        }
        if element > self.set_last {
            self.done = true;
            return;
        }
        let target_block = element / BLOCK_BITS;
        while self.base / BLOCK_BITS < target_block {
            if self.cursor.is_literal {
                self.base += BLOCK_BITS;
                if !self.cursor.advance() {
                    self.done = true;
                    return;
                }
            } else {
                let needed = target_block - self.base / BLOCK_BITS;
                let jump = needed.min(self.cursor.count);
                self.base += BLOCK_BITS * jump;
                if !self.cursor.advance_by(jump) {
                    self.done = true;
                    return;
                }
            }
        }
        self.next_bit = element % BLOCK_BITS;
    }
}

impl Iterator for Iter<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.done {
            return None;
        }
        loop {
            // The literal marker doubles as a sentinel: a trailing-zeros
            // result of 31 means no payload bit at or above `next_bit`.
            let masked = self.cursor.block_literal() & (!0u32 << self.next_bit);
            let bit = masked.trailing_zeros();
            if bit < BLOCK_BITS {
                self.next_bit = bit + 1;
                return Some(self.base + bit);
            }
            self.next_bit = 0;
            if self.cursor.is_literal {
                self.base += BLOCK_BITS;
                if !self.cursor.advance() {
                    self.done = true;
                    return None;
                }
            } else if self.cursor.fill_block_literal() == ALL_ZEROS_LITERAL {
                // Cross the whole empty run at once.
                let blocks = self.cursor.count;
                self.base += BLOCK_BITS * blocks;
                if !self.cursor.advance_by(blocks) {
                    self.done = true;
                    return None;
                }
            } else {
                self.base += BLOCK_BITS;
                if !self.cursor.advance_by(1) {
                    self.done = true;
                    return None;
                }
            }
        }
    }
}

/// Descending iterator over the elements of a [`ConciseSet`].
pub struct ReverseIter<'a> {
    cursor: ReverseWordCursor<'a>,
    base: u32,
    /// Next in-block bit to examine, descending; -1 exhausts the block.
    bit: i32,
    done: bool,
}

impl<'a> ReverseIter<'a> {
    pub(crate) fn new(set: &'a ConciseSet) -> Self {
        let done = set.is_empty();
        let last = if done { 0 } else { set.last };
        ReverseIter {
            cursor: ReverseWordCursor::new(set),
            base: last / BLOCK_BITS * BLOCK_BITS,
            bit: (last % BLOCK_BITS) as i32,
            done,
        }
    }

    /// Skip every element greater than `element` (the ones an ascending
    /// reading would call "before" is mirrored here); the following
    /// `next` yields the greatest element `<= element`, if any.
    pub fn skip_all_before(&mut self, element: u32) {
        if self.done || i64::from(element) >= i64::from(self.base) + i64::from(self.bit) {
            return;
        }
        let target_block = element / BLOCK_BITS;
        while self.base / BLOCK_BITS > target_block {
            if self.cursor.is_literal {
                if !self.cursor.retreat() {
                    self.done = true;
                    return;
                }
                self.base -= BLOCK_BITS;
            } else {
                let needed = self.base / BLOCK_BITS - target_block;
                let jump = needed.min(self.cursor.count);
                if !self.cursor.retreat_by(jump) {
                    self.done = true;
                    return;
                }
                self.base -= BLOCK_BITS * jump;
            }
        }
        self.bit = (element % BLOCK_BITS) as i32;
    }
}

impl Iterator for ReverseIter<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.done {
            return None;
        }
        loop {
            let payload = literal_bits(self.cursor.block_literal());
            let masked = if self.bit < 0 {
                0
            } else {
                payload & !(!0u32 << (self.bit as u32 + 1))
            };
            if masked != 0 {
                let bit = 31 - masked.leading_zeros();
                self.bit = bit as i32 - 1;
                return Some(self.base + bit);
            }
            self.bit = (BLOCK_BITS - 1) as i32;
            if self.cursor.is_literal {
                if !self.cursor.retreat() {
                    self.done = true;
                    return None;
                }
                self.base -= BLOCK_BITS;
            } else if self.cursor.fill_block_literal() == ALL_ZEROS_LITERAL {
                let blocks = self.cursor.count;
                if !self.cursor.retreat_by(blocks) {
                    self.done = true;
                    return None;
                }
                self.base -= BLOCK_BITS * blocks;
            } else if !self.cursor.retreat_by(1) {
                self.done = true;
                return None;
            } else {
                self.base -= BLOCK_BITS;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(elements: &[u32]) -> ConciseSet {
        elements.iter().copied().collect()
    }

    #[test]
    fn test_forward_iteration_ascends() {
        let elements = [0u32, 4, 30, 31, 62, 100, 1000, 1023];
        let s = set(&elements);
        assert_eq!(s.iter().collect::<Vec<_>>(), elements);
    }

    #[test]
    fn test_reverse_iteration_descends() {
        let elements = [0u32, 4, 30, 31, 62, 100, 1000, 1023];
        let s = set(&elements);
        let mut expected: Vec<u32> = elements.to_vec();
        expected.reverse();
        assert_eq!(s.reverse_iter().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_iteration_through_runs() {
        let mut s = ConciseSet::new();
        s.fill_range(10, 200).unwrap();
        assert_eq!(s.iter().collect::<Vec<_>>(), (10..=200).collect::<Vec<_>>());
        assert_eq!(
            s.reverse_iter().collect::<Vec<_>>(),
            (10..=200).rev().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_empty_iterators() {
        let s = ConciseSet::new();
        assert_eq!(s.iter().next(), None);
        assert_eq!(s.reverse_iter().next(), None);
    }

    #[test]
    fn test_skip_all_before_forward() {
        let s = set(&[3u32, 80, 500, 100_000]);
        let mut it = s.iter();
        it.skip_all_before(81);
        assert_eq!(it.next(), Some(500));

        let mut it = s.iter();
        it.skip_all_before(500);
        assert_eq!(it.next(), Some(500));

        // Skipping backwards is a no-op.
        let mut it = s.iter();
        assert_eq!(it.next(), Some(3));
        it.skip_all_before(0);
        assert_eq!(it.next(), Some(80));

        // Skipping past the maximum exhausts.
        let mut it = s.iter();
        it.skip_all_before(100_001);
        assert_eq!(it.next(), None);
    }

    #[test]
    fn test_skip_all_before_reverse() {
        let s = set(&[3u32, 80, 500, 100_000]);
        let mut it = s.reverse_iter();
        it.skip_all_before(499);
        assert_eq!(it.next(), Some(80));

        let mut it = s.reverse_iter();
        it.skip_all_before(500);
        assert_eq!(it.next(), Some(500));

        let mut it = s.reverse_iter();
        it.skip_all_before(2);
        assert_eq!(it.next(), None);
    }

    #[test]
    fn test_skip_lands_inside_run() {
        let mut s = ConciseSet::new();
        s.fill_range(1000, 5000).unwrap();
        let mut it = s.iter();
        it.skip_all_before(4321);
        assert_eq!(it.next(), Some(4321));
        assert_eq!(it.next(), Some(4322));

        let mut it = s.reverse_iter();
        it.skip_all_before(4321);
        assert_eq!(it.next(), Some(4321));
        assert_eq!(it.next(), Some(4320));
    }

    #[test]
    fn test_into_iterator_for_ref() {
        let s = set(&[1u32, 2, 3]);
        let mut collected = Vec::new();
        for e in &s {
            collected.push(e);
        }
        assert_eq!(collected, vec![1, 2, 3]);
    }
}
