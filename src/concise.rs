//! The CONCISE compressed integer set.
//!
//! Elements live in a conceptual dense bit string chopped into 31-bit
//! blocks; the block stream is run-length encoded into 32-bit words (the
//! `words` codec). Appends keep the encoding canonical on the fly:
//! saturated literals collapse into runs, and outside WAH mode a literal
//! holding a single set (or unset) bit can dissolve into the following
//! run as that run's flip bit. All set algebra happens directly on the
//! compressed words.

use crate::cursor::{ReverseWordCursor, WordCursor};
use crate::error::{Error, Result};
use crate::iter::{Iter, ReverseIter};
use crate::ops::{self, Operator};
use crate::words::{
    self, first_block_literal, flipped_bit, has_at_most_one_bit, is_literal, is_one_sequence,
    is_sequence_with_no_bits, is_zero_sequence, literal_bit_count, literal_bits, sequence_count,
    WordKind, ALL_ONES_LITERAL, ALL_ZEROS_LITERAL, BLOCK_BITS, SEQUENCE_BIT,
};
use std::cell::Cell;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Magic prefix of the serialized form; the trailing digits version it.
const MAGIC: &[u8; 8] = b"CNCSET01";

/// A compressed set of integers in `[0, ConciseSet::MAX_ELEMENT]`.
///
/// Dense or clustered data compresses close to a plain bitmap; sparse
/// data close to a sorted integer list. Point queries and positional
/// queries cost time proportional to the number of compressed words, and
/// the binary set operations never decompress either operand.
#[derive(Clone)]
pub struct ConciseSet {
    /// The compressed bitmap; empty means the empty set.
    pub(crate) words: Vec<u32>,
    /// Greatest element; meaningful only when `words` is non-empty.
    pub(crate) last: u32,
    /// Cached cardinality, recomputed lazily after bulk operations.
    pub(crate) size: Cell<Option<u32>>,
    /// When set, the flip-bit extension is disabled and the encoding
    /// degenerates to plain WAH.
    pub(crate) wah: bool,
}

impl ConciseSet {
    /// The highest integer a set can hold: `31 * 2^25 + 30`.
    pub const MAX_ELEMENT: u32 = words::MAX_ALLOWED_INTEGER;

    /// Create an empty set using the full CONCISE encoding.
    pub fn new() -> Self {
        ConciseSet {
            words: Vec::new(),
            last: 0,
            size: Cell::new(Some(0)),
            wah: false,
        }
    }

    /// Create an empty set restricted to WAH semantics (no flip bits).
    pub fn new_wah() -> Self {
        ConciseSet { wah: true, ..ConciseSet::new() }
    }

    /// Build a set from arbitrary values; duplicates collapse.
    ///
    /// The input is copied, sorted, and deduplicated before encoding.
    pub fn from_slice(values: &[u32]) -> Result<Self> {
        let mut sorted = values.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        if let Some(&max) = sorted.last() {
            if max > Self::MAX_ELEMENT {
                return Err(Error::ElementOutOfRange(max));
            }
        }
        let mut set = ConciseSet::new();
        for &v in &sorted {
            set.append(v);
        }
        Ok(set)
    }

    /// True when the flip-bit extension is disabled.
    pub fn is_wah_mode(&self) -> bool {
        self.wah
    }

    /// An empty set sharing this set's encoding mode.
    pub(crate) fn empty_like(&self) -> ConciseSet {
        ConciseSet {
            words: Vec::new(),
            last: 0,
            size: Cell::new(Some(0)),
            wah: self.wah,
        }
    }

    fn singleton_like(&self, e: u32) -> ConciseSet {
        let mut s = self.empty_like();
        s.append(e);
        s
    }

    pub(crate) fn words(&self) -> &[u32] {
        &self.words
    }

    pub(crate) fn set_last(&mut self, last: u32) {
        self.last = last;
    }

    fn reset(&mut self) {
        self.words = Vec::new();
        self.last = 0;
        self.size = Cell::new(Some(0));
    }

    // ---- append engine -------------------------------------------------

    /// Append a literal word after the last word, merging it into a run
    /// when the canonical form requires it.
    pub(crate) fn append_literal(&mut self, word: u32) {
        debug_assert!(is_literal(word));
        let Some(n) = self.words.len().checked_sub(1) else {
            self.words.push(word);
            return;
        };
        let last_word = self.words[n];
        if word == ALL_ZEROS_LITERAL {
            if last_word == ALL_ZEROS_LITERAL {
                self.words[n] = 1;
            } else if is_zero_sequence(last_word) {
                self.words[n] += 1;
            } else if !self.wah && has_at_most_one_bit(literal_bits(last_word)) {
                // A single-bit literal dissolves into the new zero run as
                // its flip bit.
                self.words[n] = 1 | ((1 + last_word.trailing_zeros()) << 25);
            } else {
                self.words.push(word);
            }
        } else if word == ALL_ONES_LITERAL {
            if last_word == ALL_ONES_LITERAL {
                self.words[n] = SEQUENCE_BIT | 1;
            } else if is_one_sequence(last_word) {
                self.words[n] += 1;
            } else if !self.wah && has_at_most_one_bit(!last_word) {
                self.words[n] = SEQUENCE_BIT | 1 | ((1 + (!last_word).trailing_zeros()) << 25);
            } else {
                self.words.push(word);
            }
        } else {
            self.words.push(word);
        }
    }

    /// Append a run of `length` identical blocks; `fill_type` selects the
    /// polarity through its sequence type bit.
    pub(crate) fn append_fill(&mut self, length: u32, fill_type: u32) {
        debug_assert!(length >= 1);
        let fill_type = fill_type & SEQUENCE_BIT;

        // A one-block run is just a saturated literal.
        if length == 1 {
            self.append_literal(if fill_type == 0 {
                ALL_ZEROS_LITERAL
            } else {
                ALL_ONES_LITERAL
            });
            return;
        }

        let Some(n) = self.words.len().checked_sub(1) else {
            self.words.push(fill_type | (length - 1));
            return;
        };
        let last_word = self.words[n];
        if is_literal(last_word) {
            if fill_type == 0 && last_word == ALL_ZEROS_LITERAL {
                self.words[n] = length;
            } else if fill_type == SEQUENCE_BIT && last_word == ALL_ONES_LITERAL {
                self.words[n] = SEQUENCE_BIT | length;
            } else if !self.wah && fill_type == 0 && has_at_most_one_bit(literal_bits(last_word)) {
                self.words[n] = length | ((1 + last_word.trailing_zeros()) << 25);
            } else if !self.wah
                && fill_type == SEQUENCE_BIT
                && has_at_most_one_bit(!last_word)
            {
                self.words[n] =
                    SEQUENCE_BIT | length | ((1 + (!last_word).trailing_zeros()) << 25);
            } else {
                self.words.push(fill_type | (length - 1));
            }
        } else if last_word & 0xC000_0000 == fill_type {
            self.words[n] += length;
        } else {
            self.words.push(fill_type | (length - 1));
        }
    }

    /// Set the bit for `e`, which must exceed the current maximum.
    ///
    /// The last word is a literal with at least one set bit or a one
    /// sequence, so the new bit either lands in that literal or after a
    /// freshly appended zero gap.
    pub(crate) fn append(&mut self, e: u32) {
        debug_assert!(self.is_empty() || e > self.last);

        if self.words.is_empty() {
            let zero_blocks = e / BLOCK_BITS;
            if zero_blocks == 1 {
                self.words.push(ALL_ZEROS_LITERAL);
            } else if zero_blocks > 1 {
                self.words.push(zero_blocks - 1);
            }
            self.words.push(ALL_ZEROS_LITERAL | (1 << (e % BLOCK_BITS)));
            self.last = e;
            self.size = Cell::new(Some(1));
            return;
        }

        let bit = self.last % BLOCK_BITS + (e - self.last);
        if bit >= BLOCK_BITS {
            let zero_blocks = bit / BLOCK_BITS - 1;
            let bit = bit % BLOCK_BITS;
            if zero_blocks > 0 {
                self.append_fill(zero_blocks, 0);
            }
            self.append_literal(ALL_ZEROS_LITERAL | (1 << bit));
        } else {
            let n = self.words.len() - 1;
            self.words[n] |= 1 << bit;
            if self.words[n] == ALL_ONES_LITERAL {
                // Re-append so the saturated literal can join a run.
                self.words.pop();
                self.append_literal(ALL_ONES_LITERAL);
            }
        }

        self.last = e;
        if let Some(s) = self.size.get() {
            self.size.set(Some(s + 1));
        }
    }

    // ---- maintenance ---------------------------------------------------

    /// Strip trailing all-zero words; a trailing zero run that carries a
    /// flip bit shrinks to the single-bit literal it hides.
    pub(crate) fn trim_zeros(&mut self) {
        loop {
            let Some(&w) = self.words.last() else {
                self.reset();
                return;
            };
            if w == ALL_ZEROS_LITERAL {
                self.words.pop();
            } else if is_zero_sequence(w) {
                if self.wah || is_sequence_with_no_bits(w) {
                    self.words.pop();
                } else {
                    let n = self.words.len() - 1;
                    self.words[n] = first_block_literal(w, false);
                    return;
                }
            } else {
                return;
            }
        }
    }

    /// Recompute `last` from the words; the set must be non-empty.
    pub(crate) fn update_last(&mut self) {
        debug_assert!(!self.words.is_empty());
        let mut last = 0u32;
        for &w in &self.words {
            last += if is_literal(w) {
                BLOCK_BITS
            } else {
                BLOCK_BITS * (sequence_count(w) + 1)
            };
        }
        let w = self.words[self.words.len() - 1];
        if is_literal(w) {
            last -= literal_bits(w).leading_zeros();
        } else {
            last -= 1;
        }
        self.last = last;
    }

    /// Give back over-allocated capacity once it exceeds twice the need.
    pub(crate) fn compact_words(&mut self) {
        if self.words.len() * 2 < self.words.capacity() {
            self.words.shrink_to_fit();
        }
    }

    // ---- cardinality & membership --------------------------------------

    /// True when the set holds no element.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Number of elements in the set.
    pub fn len(&self) -> usize {
        if let Some(s) = self.size.get() {
            return s as usize;
        }
        let mut s = 0u32;
        for &w in &self.words {
            match words::kind(w) {
                WordKind::Literal => s += literal_bit_count(w),
                WordKind::ZeroFill => {
                    if !is_sequence_with_no_bits(w) {
                        s += 1;
                    }
                }
                WordKind::OneFill => {
                    s += BLOCK_BITS * (sequence_count(w) + 1);
                    if !is_sequence_with_no_bits(w) {
                        s -= 1;
                    }
                }
            }
        }
        self.size.set(Some(s));
        s as usize
    }

    /// True when `e` is in the set.
    pub fn contains(&self, e: u32) -> bool {
        if self.is_empty() || e > self.last {
            return false;
        }
        let mut block = e / BLOCK_BITS;
        let bit = e % BLOCK_BITS;
        for &w in &self.words {
            match words::kind(w) {
                WordKind::Literal => {
                    if block == 0 {
                        return w & (1 << bit) != 0;
                    }
                    block -= 1;
                }
                WordKind::ZeroFill => {
                    if !self.wah && block == 0 && flipped_bit(w) == Some(bit) {
                        return true;
                    }
                    let span = sequence_count(w) + 1;
                    if block < span {
                        return false;
                    }
                    block -= span;
                }
                WordKind::OneFill => {
                    if !self.wah && block == 0 && flipped_bit(w) == Some(bit) {
                        return false;
                    }
                    let span = sequence_count(w) + 1;
                    if block < span {
                        return true;
                    }
                    block -= span;
                }
            }
        }
        false
    }

    /// The least element, if any.
    pub fn first(&self) -> Option<u32> {
        self.iter().next()
    }

    /// The greatest element, if any.
    pub fn last(&self) -> Option<u32> {
        if self.is_empty() {
            None
        } else {
            Some(self.last)
        }
    }

    // ---- point mutation ------------------------------------------------

    /// Insert `e`; returns whether the set changed.
    pub fn add(&mut self, e: u32) -> Result<bool> {
        if e > Self::MAX_ELEMENT {
            return Err(Error::ElementOutOfRange(e));
        }
        Ok(self.add_in_range(e))
    }

    pub(crate) fn add_in_range(&mut self, e: u32) -> bool {
        if self.is_empty() || e > self.last {
            self.append(e);
            return true;
        }
        if e == self.last {
            return false;
        }

        // Try to flip the bit inside a literal word, but only when the
        // flip cannot trigger a merge with neighbouring words.
        let mut block = e / BLOCK_BITS;
        let bit = e % BLOCK_BITS;
        let mut i = 0;
        'walk: while i < self.words.len() {
            let w = self.words[i];
            if is_literal(w) {
                if block == 0 {
                    if w & (1 << bit) != 0 {
                        return false;
                    }
                    let needs_rebuild = if self.wah {
                        has_at_most_one_bit(!w) || w == ALL_ONES_LITERAL
                    } else {
                        literal_bit_count(w) >= BLOCK_BITS - 2
                    };
                    if needs_rebuild {
                        break 'walk;
                    }
                    self.words[i] |= 1 << bit;
                    if let Some(s) = self.size.get() {
                        self.size.set(Some(s + 1));
                    }
                    return true;
                }
                block -= 1;
            } else {
                let span = sequence_count(w) + 1;
                if self.wah {
                    if is_one_sequence(w) && block < span {
                        return false;
                    }
                } else {
                    if block == 0 && first_block_literal(w, false) & (1 << bit) != 0 {
                        return false;
                    }
                    if block >= 1 && block < span && is_one_sequence(w) {
                        return false;
                    }
                }
                if block < span {
                    break 'walk;
                }
                block -= span;
            }
            i += 1;
        }

        // The bit falls inside a run, or flipping it would allow a merge:
        // rebuild through the operation engine.
        let single = self.singleton_like(e);
        let res = ops::perform(self, &single, Operator::Or);
        self.replace_with(res)
    }

    /// Remove `e`; returns whether the set changed.
    pub fn remove(&mut self, e: u32) -> bool {
        if self.is_empty() || e > self.last {
            return false;
        }

        let mut block = e / BLOCK_BITS;
        let bit = e % BLOCK_BITS;
        let mut i = 0;
        'walk: while i < self.words.len() {
            let w = self.words[i];
            if is_literal(w) {
                if block == 0 {
                    if w & (1 << bit) == 0 {
                        return false;
                    }
                    let needs_rebuild = if self.wah {
                        has_at_most_one_bit(literal_bits(w))
                    } else {
                        literal_bit_count(w) <= 2
                    };
                    if needs_rebuild {
                        break 'walk;
                    }
                    self.words[i] &= !(1 << bit);
                    if let Some(s) = self.size.get() {
                        self.size.set(Some(s - 1));
                    }
                    if e == self.last {
                        let high = 31 - literal_bits(self.words[i]).leading_zeros();
                        self.last = self.last - self.last % BLOCK_BITS + high;
                    }
                    return true;
                }
                block -= 1;
            } else {
                let span = sequence_count(w) + 1;
                if self.wah {
                    if is_zero_sequence(w) && block < span {
                        return false;
                    }
                } else {
                    if block == 0 && first_block_literal(w, false) & (1 << bit) == 0 {
                        return false;
                    }
                    if block >= 1 && block < span && is_zero_sequence(w) {
                        return false;
                    }
                }
                if block < span {
                    break 'walk;
                }
                block -= span;
            }
            i += 1;
        }

        let single = self.singleton_like(e);
        let res = ops::perform(self, &single, Operator::AndNot);
        self.replace_with(res)
    }

    /// Toggle `e`'s membership.
    pub fn flip(&mut self, e: u32) -> Result<()> {
        if e > Self::MAX_ELEMENT {
            return Err(Error::ElementOutOfRange(e));
        }
        if !self.add_in_range(e) {
            self.remove(e);
        }
        Ok(())
    }

    /// Remove every element.
    pub fn clear(&mut self) {
        self.reset();
    }

    /// Adopt `other`'s representation unless it matches the current one;
    /// returns whether anything changed.
    fn replace_with(&mut self, other: ConciseSet) -> bool {
        let similar = if self.is_empty() || other.is_empty() {
            self.is_empty() && other.is_empty()
        } else {
            self.last == other.last && self.words == other.words
        };
        if similar {
            if let Some(s) = other.size.get() {
                self.size.set(Some(s));
            }
            return false;
        }
        self.words = other.words;
        self.last = other.last;
        self.size = other.size;
        true
    }

    // ---- positional ----------------------------------------------------

    /// The `i`-th smallest element.
    pub fn get(&self, i: usize) -> Result<u32> {
        let mut base = 0u32;
        let mut pos = i as u64;
        for &w in &self.words {
            if is_literal(w) {
                let contributed = literal_bit_count(w) as u64;
                if pos < contributed {
                    // Select within the literal: clear the lowest `pos`
                    // bits, then take the next one.
                    let mut bits = literal_bits(w);
                    for _ in 0..pos {
                        bits &= bits - 1;
                    }
                    return Ok(base + bits.trailing_zeros());
                }
                base += BLOCK_BITS;
                pos -= contributed;
            } else {
                let span_bits = BLOCK_BITS * (sequence_count(w) + 1);
                if is_one_sequence(w) {
                    if self.wah || is_sequence_with_no_bits(w) {
                        if pos < span_bits as u64 {
                            return Ok(base + pos as u32);
                        }
                        pos -= span_bits as u64;
                    } else {
                        let contributed = span_bits as u64 - 1;
                        if pos < contributed {
                            let flip = flipped_bit(w).unwrap_or(0);
                            let skip = u32::from(pos as u32 >= flip);
                            return Ok(base + pos as u32 + skip);
                        }
                        pos -= contributed;
                    }
                } else if !self.wah && !is_sequence_with_no_bits(w) {
                    if pos == 0 {
                        return Ok(base + flipped_bit(w).unwrap_or(0));
                    }
                    pos -= 1;
                }
                base += span_bits;
            }
        }
        Err(Error::IndexOutOfBounds(i))
    }

    /// Rank of `e` among the elements, if present.
    pub fn index_of(&self, e: u32) -> Option<usize> {
        if self.is_empty() || e > self.last {
            return None;
        }
        let mut index = 0u32;
        let mut block = e / BLOCK_BITS;
        let bit = e % BLOCK_BITS;
        for &w in &self.words {
            if is_literal(w) {
                if block == 0 {
                    if w & (1 << bit) == 0 {
                        return None;
                    }
                    let below = (w & !(!0u32 << bit)).count_ones();
                    return Some((index + below) as usize);
                }
                block -= 1;
                index += literal_bit_count(w);
            } else {
                let span = sequence_count(w) + 1;
                if self.wah {
                    if is_one_sequence(w) && block < span {
                        return Some((index + BLOCK_BITS * block + bit) as usize);
                    }
                } else {
                    if block == 0 {
                        let l = first_block_literal(w, false);
                        if l & (1 << bit) == 0 {
                            return None;
                        }
                        let below = (l & !(!0u32 << bit)).count_ones();
                        return Some((index + below) as usize);
                    }
                    if block >= 1 && block < span && is_one_sequence(w) {
                        let flip_adjust = u32::from(!is_sequence_with_no_bits(w));
                        return Some((index + BLOCK_BITS * block + bit - flip_adjust) as usize);
                    }
                }
                if block < span {
                    return None;
                }
                block -= span;
                if is_zero_sequence(w) {
                    if !self.wah && !is_sequence_with_no_bits(w) {
                        index += 1;
                    }
                } else {
                    index += BLOCK_BITS * span;
                    if !self.wah && !is_sequence_with_no_bits(w) {
                        index -= 1;
                    }
                }
            }
        }
        None
    }

    // ---- bulk operations -----------------------------------------------

    /// Add every element of `other`; returns whether the set changed.
    pub fn add_all(&mut self, other: &ConciseSet) -> bool {
        if other.is_empty() {
            return false;
        }
        if other.len() == 1 {
            return self.add_in_range(other.last);
        }
        let res = ops::perform(self, other, Operator::Or);
        self.replace_with(res)
    }

    /// Remove every element of `other`; returns whether the set changed.
    pub fn remove_all(&mut self, other: &ConciseSet) -> bool {
        if other.is_empty() || self.is_empty() {
            return false;
        }
        if other.len() == 1 {
            return self.remove(other.last);
        }
        let res = ops::perform(self, other, Operator::AndNot);
        self.replace_with(res)
    }

    /// Keep only elements also in `other`; returns whether the set changed.
    pub fn retain_all(&mut self, other: &ConciseSet) -> bool {
        if self.is_empty() {
            return false;
        }
        if other.is_empty() {
            self.clear();
            return true;
        }
        if other.len() == 1 {
            if self.contains(other.last) {
                if self.len() == 1 {
                    return false;
                }
                let single = self.singleton_like(other.last);
                return self.replace_with(single);
            }
            self.clear();
            return true;
        }
        let res = ops::perform(self, other, Operator::And);
        self.replace_with(res)
    }

    /// True when every element of `other` is in this set.
    pub fn contains_all(&self, other: &ConciseSet) -> bool {
        if other.is_empty() || std::ptr::eq(self, other) {
            return true;
        }
        if self.is_empty() {
            return false;
        }
        if other.last > self.last {
            return false;
        }
        if let (Some(s), Some(o)) = (self.size.get(), other.size.get()) {
            if o > s {
                return false;
            }
        }
        if other.size.get() == Some(1) {
            return self.contains(other.last);
        }

        let mut a = WordCursor::new(self);
        let mut b = WordCursor::new(other);
        loop {
            let ia = a.block_literal();
            let ib = b.block_literal();
            if literal_bits(ib) & !literal_bits(ia) != 0 {
                return false;
            }
            let (a_more, b_more) = if !a.is_literal && !b.is_literal {
                let k = a.count.min(b.count);
                (a.advance_by(k), b.advance_by(k))
            } else {
                (
                    if a.is_literal { a.advance() } else { a.advance_by(1) },
                    if b.is_literal { b.advance() } else { b.advance_by(1) },
                )
            };
            if !b_more {
                return true;
            }
            if !a_more {
                return false;
            }
        }
    }

    /// True when the two sets share at least one element.
    pub fn contains_any(&self, other: &ConciseSet) -> bool {
        if other.is_empty() || std::ptr::eq(self, other) {
            return true;
        }
        if self.is_empty() {
            return false;
        }
        if other.size.get() == Some(1) {
            return self.contains(other.last);
        }
        if let Some(shortcut) = self.disjoint_overlap_shortcut(other) {
            return shortcut;
        }

        let mut a = WordCursor::new(self);
        let mut b = WordCursor::new(other);
        loop {
            let (a_more, b_more) = if !a.is_literal && !b.is_literal {
                if a.fill_block_literal() & b.fill_block_literal() != ALL_ZEROS_LITERAL {
                    return true;
                }
                let k = a.count.min(b.count);
                (a.advance_by(k), b.advance_by(k))
            } else {
                if literal_bits(a.block_literal() & b.block_literal()) != 0 {
                    return true;
                }
                (
                    if a.is_literal { a.advance() } else { a.advance_by(1) },
                    if b.is_literal { b.advance() } else { b.advance_by(1) },
                )
            };
            if !a_more || !b_more {
                return false;
            }
        }
    }

    /// True when the intersection holds at least `min_elements` elements.
    pub fn contains_at_least(&self, other: &ConciseSet, min_elements: usize) -> Result<bool> {
        if min_elements < 1 {
            return Err(Error::InvalidArgument("min_elements must be at least 1"));
        }
        if self.is_empty() || other.is_empty() {
            return Ok(false);
        }
        if std::ptr::eq(self, other) {
            return Ok(self.len() >= min_elements);
        }
        if self.len() < min_elements || other.len() < min_elements {
            return Ok(false);
        }
        if min_elements == 1 && other.len() == 1 {
            return Ok(self.contains(other.last));
        }
        if min_elements == 1 && self.len() == 1 {
            return Ok(other.contains(self.last));
        }
        if let Some(shared) = self.disjoint_overlap_shortcut(other) {
            // A covering one run keeps the smaller set intact, and both
            // cardinalities were already checked against the threshold.
            return Ok(shared);
        }

        let mut total = 0usize;
        let mut a = WordCursor::new(self);
        let mut b = WordCursor::new(other);
        loop {
            let (a_more, b_more) = if !a.is_literal && !b.is_literal {
                let k = a.count.min(b.count);
                if a.fill_block_literal() & b.fill_block_literal() == ALL_ONES_LITERAL {
                    total += (BLOCK_BITS * k) as usize;
                }
                (a.advance_by(k), b.advance_by(k))
            } else {
                total += literal_bits(a.block_literal() & b.block_literal()).count_ones() as usize;
                (
                    if a.is_literal { a.advance() } else { a.advance_by(1) },
                    if b.is_literal { b.advance() } else { b.advance_by(1) },
                )
            };
            if total >= min_elements {
                return Ok(true);
            }
            if !a_more || !b_more {
                return Ok(false);
            }
        }
    }

    /// When one operand's leading flip-free run swallows the other's whole
    /// span, overlap is decided by the run polarity alone.
    fn disjoint_overlap_shortcut(&self, other: &ConciseSet) -> Option<bool> {
        if is_sequence_with_no_bits(self.words[0])
            && BLOCK_BITS * (sequence_count(self.words[0]) + 1) > other.last
        {
            return Some(is_one_sequence(self.words[0]));
        }
        if is_sequence_with_no_bits(other.words[0])
            && BLOCK_BITS * (sequence_count(other.words[0]) + 1) > self.last
        {
            return Some(is_one_sequence(other.words[0]));
        }
        None
    }

    // ---- algebra -------------------------------------------------------

    /// Elements in either set.
    pub fn union(&self, other: &ConciseSet) -> ConciseSet {
        ops::perform(self, other, Operator::Or)
    }

    /// Elements in both sets.
    pub fn intersection(&self, other: &ConciseSet) -> ConciseSet {
        ops::perform(self, other, Operator::And)
    }

    /// Elements in this set but not in `other`.
    pub fn difference(&self, other: &ConciseSet) -> ConciseSet {
        ops::perform(self, other, Operator::AndNot)
    }

    /// Elements in exactly one of the two sets.
    pub fn symmetric_difference(&self, other: &ConciseSet) -> ConciseSet {
        ops::perform(self, other, Operator::Xor)
    }

    /// Complement in place over `[0, last]`.
    pub fn complement(&mut self) {
        if self.is_empty() {
            return;
        }
        if self.last == 0 {
            self.clear();
            return;
        }
        if let Some(s) = self.size.get() {
            self.size.set(Some(self.last - s + 1));
        }
        for w in &mut self.words {
            if is_literal(*w) {
                *w = ALL_ZEROS_LITERAL | !*w;
            } else {
                *w ^= SEQUENCE_BIT;
            }
        }
        // Bits past the old maximum are not part of the universe.
        let n = self.words.len() - 1;
        if is_literal(self.words[n]) {
            let keep = self.last % BLOCK_BITS;
            self.words[n] &= ALL_ZEROS_LITERAL | (ALL_ONES_LITERAL >> (31 - keep));
        }
        self.trim_zeros();
        if self.is_empty() {
            return;
        }
        self.update_last();
    }

    /// A fresh complement over `[0, last]`.
    pub fn complemented(&self) -> ConciseSet {
        let mut res = self.clone();
        res.complement();
        res
    }

    // ---- ranges --------------------------------------------------------

    /// The inclusive range `[from, to]` in this set's encoding mode,
    /// built by complementing around the endpoints.
    fn range_like(&self, from: u32, to: u32) -> ConciseSet {
        let mut to_add = self.singleton_like(to);
        to_add.complement();
        to_add.add_in_range(to);
        if from > 0 {
            let mut to_remove = self.singleton_like(from);
            to_remove.complement();
            to_add.remove_all(&to_remove);
        }
        to_add
    }

    /// Add every element of the inclusive range `[from, to]`.
    ///
    /// An inverted range is a no-op.
    pub fn fill_range(&mut self, from: u32, to: u32) -> Result<()> {
        if from > Self::MAX_ELEMENT {
            return Err(Error::ElementOutOfRange(from));
        }
        if to > Self::MAX_ELEMENT {
            return Err(Error::ElementOutOfRange(to));
        }
        if from > to {
            return Ok(());
        }
        let range = self.range_like(from, to);
        self.add_all(&range);
        Ok(())
    }

    /// Remove every element of the inclusive range `[from, to]`.
    ///
    /// An inverted range is a no-op.
    pub fn clear_range(&mut self, from: u32, to: u32) -> Result<()> {
        if from > Self::MAX_ELEMENT {
            return Err(Error::ElementOutOfRange(from));
        }
        if to > Self::MAX_ELEMENT {
            return Err(Error::ElementOutOfRange(to));
        }
        if from > to || self.is_empty() {
            return Ok(());
        }
        let range = self.range_like(from, to);
        self.remove_all(&range);
        Ok(())
    }

    // ---- combination sizes ---------------------------------------------

    /// `|self ∩ other|`, computed without materializing the intersection.
    pub fn intersection_size(&self, other: &ConciseSet) -> usize {
        if self.is_empty() || other.is_empty() {
            return 0;
        }
        if std::ptr::eq(self, other) {
            return self.len();
        }
        if self.len() == 1 {
            return usize::from(other.contains(self.last));
        }
        if other.len() == 1 {
            return usize::from(self.contains(other.last));
        }
        if let Some(shared) = self.disjoint_overlap_shortcut(other) {
            if !shared {
                return 0;
            }
            // A covering one run keeps the smaller set intact.
            return self.len().min(other.len());
        }

        let mut total = 0usize;
        let mut a = WordCursor::new(self);
        let mut b = WordCursor::new(other);
        loop {
            let (a_more, b_more) = if !a.is_literal && !b.is_literal {
                let k = a.count.min(b.count);
                if a.fill_block_literal() & b.fill_block_literal() == ALL_ONES_LITERAL {
                    total += (BLOCK_BITS * k) as usize;
                }
                (a.advance_by(k), b.advance_by(k))
            } else {
                total += literal_bits(a.block_literal() & b.block_literal()).count_ones() as usize;
                (
                    if a.is_literal { a.advance() } else { a.advance_by(1) },
                    if b.is_literal { b.advance() } else { b.advance_by(1) },
                )
            };
            if !a_more || !b_more {
                return total;
            }
        }
    }

    /// `|self ∪ other|`.
    pub fn union_size(&self, other: &ConciseSet) -> usize {
        self.len() + other.len() - self.intersection_size(other)
    }

    /// `|self \ other|`.
    pub fn difference_size(&self, other: &ConciseSet) -> usize {
        self.len() - self.intersection_size(other)
    }

    /// `|self Δ other|`.
    pub fn symmetric_difference_size(&self, other: &ConciseSet) -> usize {
        self.len() + other.len() - 2 * self.intersection_size(other)
    }

    /// Number of absent values in `[0, last]`; 0 for the empty set.
    pub fn complement_size(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        self.last as usize + 1 - self.len()
    }

    // ---- iteration & conversion ----------------------------------------

    /// Iterate the elements in ascending order.
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(self)
    }

    /// Iterate the elements in descending order.
    pub fn reverse_iter(&self) -> ReverseIter<'_> {
        ReverseIter::new(self)
    }

    /// The elements as a sorted vector.
    pub fn to_vec(&self) -> Vec<u32> {
        self.iter().collect()
    }

    // ---- introspection -------------------------------------------------

    /// Used words over the words a plain bitmap spanning `[0, last]`
    /// would need; values below 1.0 mean the encoding is winning.
    pub fn bitmap_compression_ratio(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.words.len() as f64 / ((self.last as f64 + 1.0) / 32.0).ceil()
    }

    /// Used words per stored element; 1.0 matches a plain sorted array.
    pub fn collection_compression_ratio(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.words.len() as f64 / self.len() as f64
    }

    // ---- serialization -------------------------------------------------

    /// Serialize to a stable little-endian encoding: magic, mode flag,
    /// word count, then the used words.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(13 + self.words.len() * 4);
        out.extend_from_slice(MAGIC);
        out.push(u8::from(self.wah));
        out.extend_from_slice(&(self.words.len() as u32).to_le_bytes());
        for &w in &self.words {
            out.extend_from_slice(&w.to_le_bytes());
        }
        out
    }

    /// Deserialize the output of [`ConciseSet::to_bytes`].
    ///
    /// The maximum element is recomputed from the words; the cardinality
    /// is left to lazy recomputation.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut off = 0usize;
        let mut take = |n: usize| -> Result<&[u8]> {
            if off + n > bytes.len() {
                return Err(Error::InvalidEncoding("unexpected end of input".to_string()));
            }
            let slice = &bytes[off..off + n];
            off += n;
            Ok(slice)
        };

        if take(8)? != MAGIC {
            return Err(Error::InvalidEncoding("bad magic for ConciseSet".to_string()));
        }
        let wah = match take(1)?[0] {
            0 => false,
            1 => true,
            flag => {
                return Err(Error::InvalidEncoding(format!("bad mode flag: {flag}")));
            }
        };
        let count = u32::from_le_bytes(take(4)?.try_into().unwrap_or([0; 4])) as usize;

        // Bound allocation against total input to prevent allocation bombs.
        if count.saturating_mul(4) > bytes.len() {
            return Err(Error::InvalidEncoding(format!(
                "word count ({count}) too large for input ({} bytes)",
                bytes.len()
            )));
        }
        let mut set_words = Vec::with_capacity(count);
        for _ in 0..count {
            let w = u32::from_le_bytes(take(4)?.try_into().unwrap_or([0; 4]));
            set_words.push(w);
        }
        if off != bytes.len() {
            return Err(Error::InvalidEncoding("trailing bytes after set".to_string()));
        }

        if set_words.is_empty() {
            let mut empty = ConciseSet::new();
            empty.wah = wah;
            return Ok(empty);
        }

        let last_word = set_words[set_words.len() - 1];
        let canonical_tail = (is_literal(last_word) && literal_bits(last_word) != 0)
            || is_one_sequence(last_word);
        if !canonical_tail {
            return Err(Error::InvalidEncoding(
                "bitmap ends in trailing zeros".to_string(),
            ));
        }
        let mut total_bits = 0u64;
        for &w in &set_words {
            if wah && !is_literal(w) && !is_sequence_with_no_bits(w) {
                return Err(Error::InvalidEncoding(
                    "flip bit present in WAH-mode bitmap".to_string(),
                ));
            }
            // The encoder expresses a one-block run as a literal, so a
            // count-0 sequence cannot come from us; the append engine
            // also relies on their absence.
            if !is_literal(w) && sequence_count(w) == 0 {
                return Err(Error::InvalidEncoding(
                    "zero-length sequence word".to_string(),
                ));
            }
            total_bits += if is_literal(w) {
                u64::from(BLOCK_BITS)
            } else {
                u64::from(BLOCK_BITS) * u64::from(sequence_count(w) + 1)
            };
        }
        if total_bits > u64::from(Self::MAX_ELEMENT) + 1 {
            return Err(Error::InvalidEncoding(format!(
                "bitmap spans {total_bits} bits, beyond the element domain"
            )));
        }

        let mut set = ConciseSet {
            words: set_words,
            last: 0,
            size: Cell::new(None),
            wah,
        };
        set.update_last();
        Ok(set)
    }
}

impl Default for ConciseSet {
    fn default() -> Self {
        ConciseSet::new()
    }
}

impl fmt::Debug for ConciseSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConciseSet")
            .field("len", &self.len())
            .field("last", &self.last())
            .field("words", &self.words.len())
            .field("wah", &self.wah)
            .finish()
    }
}

impl PartialEq for ConciseSet {
    fn eq(&self, other: &Self) -> bool {
        if self.is_empty() || other.is_empty() {
            return self.is_empty() == other.is_empty();
        }
        self.last == other.last && self.words == other.words
    }
}

impl Eq for ConciseSet {}

impl Hash for ConciseSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut h: u32 = 1;
        for &w in &self.words {
            h = (h << 5).wrapping_sub(h).wrapping_add(w);
        }
        state.write_u32(h);
    }
}

impl Ord for ConciseSet {
    /// Orders sets by their content read as a binary number, most
    /// significant block first.
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_empty(), other.is_empty()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }
        let by_last = self.last.cmp(&other.last);
        if by_last != Ordering::Equal {
            return by_last;
        }
        // Equal maxima mean equal block counts, so the reverse cursors
        // stay aligned all the way down.
        let mut a = ReverseWordCursor::new(self);
        let mut b = ReverseWordCursor::new(other);
        loop {
            let pa = literal_bits(a.block_literal());
            let pb = literal_bits(b.block_literal());
            if pa != pb {
                return pa.cmp(&pb);
            }
            let (a_more, b_more) = if !a.is_literal && !b.is_literal {
                let k = a.count.min(b.count);
                (a.retreat_by(k), b.retreat_by(k))
            } else {
                (
                    if a.is_literal { a.retreat() } else { a.retreat_by(1) },
                    if b.is_literal { b.retreat() } else { b.retreat_by(1) },
                )
            };
            match (a_more, b_more) {
                (true, true) => {}
                (false, false) => return Ordering::Equal,
                (true, false) => return Ordering::Greater,
                (false, true) => return Ordering::Less,
            }
        }
    }
}

impl PartialOrd for ConciseSet {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromIterator<u32> for ConciseSet {
    /// Collects arbitrary values, sorting and deduplicating first.
    ///
    /// # Panics
    ///
    /// Panics when a value exceeds [`ConciseSet::MAX_ELEMENT`]; use
    /// [`ConciseSet::from_slice`] for a fallible build.
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let values: Vec<u32> = iter.into_iter().collect();
        match ConciseSet::from_slice(&values) {
            Ok(set) => set,
            Err(_) => panic!("element out of range for ConciseSet"),
        }
    }
}

impl<'a> IntoIterator for &'a ConciseSet {
    type Item = u32;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
