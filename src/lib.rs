//! # CONCISE Compressed Integer Sets
//!
//! *Set algebra that never decompresses.*
//!
//! ## Intuition First
//!
//! Picture a guest list for a stadium with a billion numbered seats.
//! A plain bitmap reserves one bit per seat: fast to query, ruinous to
//! store when only a handful of seats are taken. A sorted list of seat
//! numbers is tight when attendance is sparse, but merging two lists
//! means walking every entry.
//!
//! Run-length-encoded bitmaps keep the best of both: long stretches of
//! empty (or full) seats collapse into a single word saying "the next
//! *n* rows look like this", while messy rows stay as verbatim bit
//! blocks. Crucially, two such encodings can be ANDed, ORed, and XORed
//! *against each other directly*, run against run, without ever
//! materializing the billion seats.
//!
//! ## The Problem
//!
//! Word-aligned run-length schemes face a trade-off:
//! - **WAH** (Word-Aligned Hybrid): pure runs and literals. A single
//!   stray bit inside a long run breaks it into three words.
//! - **Uncompressed bitmaps**: $O(1)$ membership but $O(U)$ space for a
//!   universe of size $U$, regardless of how few elements exist.
//!
//! ## Historical Context
//!
//! ```text
//! 1998  Wu et al.    Byte-aligned bitmap codes for scientific data
//! 2002  Wu-Otoo-     WAH: word-aligned hybrid run-length encoding,
//!       Shoshani     CPU-friendly 31-bit blocks
//! 2010  Colantonio-  CONCISE: WAH plus a 5-bit "flip position" that
//!       Di Pietro    absorbs a lone dirty bit into the run word
//! 2014  Chambi et    Roaring: partitioned containers, the modern
//!       al.          default for large universes
//! ```
//!
//! CONCISE's observation is that real data is rarely *perfectly* runny:
//! runs are interrupted by single stragglers. Spending 5 spare header
//! bits on the position of one flipped bit inside a run's first block
//! lets the encoder keep the run as one word where WAH needs three.
//!
//! ## Mathematical Formulation
//!
//! The universe is chopped into blocks of 31 bits. Each 32-bit word is
//! either a *literal* (31 payload bits, marker bit set) or a *sequence*:
//! 2 type bits, a 5-bit flip position $F$, and a 25-bit count $C$
//! encoding $C + 1$ uniform blocks, with one bit at position $F - 1$ of
//! the first block flipped when $F \neq 0$. The representable domain is
//! $[0,\ 31 \cdot 2^{25} + 30]$.
//!
//! Binary operations walk both operands word-by-word, so
//! `union`/`intersection`/`difference`/`symmetric_difference` cost
//! $O(|A_w| + |B_w|)$ in compressed words, never $O(U)$.
//!
//! ## What Could Go Wrong
//!
//! 1. **Adversarial density**: alternating bits defeat run-length coding;
//!    the encoding degrades gracefully to one literal per block (≈3%
//!    overhead over a plain bitmap, from the sacrificed bit per word).
//! 2. **Mid-universe inserts**: adding a bit inside an existing run must
//!    split it, which costs a rebuild of the word array; appends at the
//!    top stay $O(1)$ amortized.
//!
//! ## Implementation Notes
//!
//! This crate provides:
//! - **`ConciseSet`**: the compressed set with point, positional, bulk,
//!   and algebraic operations, plus a WAH-compatibility mode.
//! - **`Iter` / `ReverseIter`**: ordered iterators with run-skipping
//!   `skip_all_before`.
//!
//! ## References
//!
//! - Colantonio, A., & Di Pietro, R. (2010). "CONCISE: Compressed 'n'
//!   Composable Integer Set."
//! - Wu, K., Otoo, E. J., & Shoshani, A. (2002). "Compressing bitmap
//!   indexes for faster search operations."

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod concise;
mod cursor;
pub mod error;
pub mod iter;
mod ops;
mod words;

pub use concise::ConciseSet;
pub use error::{Error, Result};
pub use iter::{Iter, ReverseIter};
