//! The dual-cursor engine behind the binary set operations.
//!
//! Two forward cursors walk the operands in lock-step. Runs that overlap
//! on both sides collapse into a single fill append; everything else is
//! combined literal-by-literal. The literal combiner doubles as the
//! type-bit combiner for run/run steps, because the sequence type bit
//! sits in the same position on both operands.

use crate::concise::ConciseSet;
use crate::cursor::WordCursor;
use crate::words::{
    is_one_sequence, is_sequence_with_no_bits, is_zero_sequence, sequence_count,
    ALL_ZEROS_LITERAL, BLOCK_BITS,
};
use std::cell::Cell;

/// Per-literal bitwise action of a binary set operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operator {
    And,
    Or,
    Xor,
    AndNot,
}

impl Operator {
    /// Combine two 31-bit literals, keeping the result a literal.
    #[inline]
    pub(crate) fn combine_literals(self, a: u32, b: u32) -> u32 {
        match self {
            Operator::And => a & b,
            Operator::Or => a | b,
            Operator::Xor => ALL_ZEROS_LITERAL | (a ^ b),
            Operator::AndNot => ALL_ZEROS_LITERAL | (a & !b),
        }
    }
}

/// True when `x` opens with a flip-free run that spans strictly past the
/// maximum element of `y`, hiding all of `y` inside one uniform region.
fn covers(x: &ConciseSet, y: &ConciseSet) -> bool {
    is_sequence_with_no_bits(x.words[0])
        && BLOCK_BITS * (sequence_count(x.words[0]) + 1) > y.last
}

/// Compute `a <op> b` into a freshly allocated set.
pub(crate) fn perform(a: &ConciseSet, b: &ConciseSet, op: Operator) -> ConciseSet {
    if a.is_empty() || b.is_empty() {
        return combine_empty(a, b, op);
    }
    if let Some(res) = combine_disjoint(a, b, op) {
        return res;
    }
    general(a, b, op)
}

fn combine_empty(a: &ConciseSet, b: &ConciseSet, op: Operator) -> ConciseSet {
    match op {
        Operator::And => a.empty_like(),
        Operator::Or | Operator::Xor => {
            if !a.is_empty() {
                a.clone()
            } else if !b.is_empty() {
                b.clone()
            } else {
                a.empty_like()
            }
        }
        Operator::AndNot => {
            if !a.is_empty() {
                a.clone()
            } else {
                a.empty_like()
            }
        }
    }
}

fn combine_disjoint(a: &ConciseSet, b: &ConciseSet, op: Operator) -> Option<ConciseSet> {
    match op {
        Operator::And => and_one_way(a, b).or_else(|| and_one_way(b, a)),
        Operator::Or => or_one_way(a, b).or_else(|| or_one_way(b, a)),
        Operator::Xor => xor_one_way(a, b).or_else(|| xor_one_way(b, a)),
        Operator::AndNot => {
            if covers(a, b) {
                if is_zero_sequence(a.words[0]) {
                    // b lies entirely inside a's leading zero run.
                    return Some(a.clone());
                }
                // a's leading one run must be punched through; no shortcut.
                return None;
            }
            if covers(b, a) {
                if is_zero_sequence(b.words[0]) {
                    return Some(a.clone());
                }
                // a lies entirely inside b's leading one run.
                return Some(a.empty_like());
            }
            None
        }
    }
}

fn and_one_way(x: &ConciseSet, y: &ConciseSet) -> Option<ConciseSet> {
    if !covers(x, y) {
        return None;
    }
    if is_zero_sequence(x.words[0]) {
        return Some(x.empty_like());
    }
    // y sits entirely inside x's leading one run.
    Some(y.clone())
}

fn or_one_way(x: &ConciseSet, y: &ConciseSet) -> Option<ConciseSet> {
    if !covers(x, y) {
        return None;
    }
    if is_one_sequence(x.words[0]) {
        return Some(x.clone());
    }
    // y is untouched by x's leading zero run; keep y's words and append
    // whatever of x lies beyond y's span.
    let mut res = x.empty_like();
    res.words = Vec::with_capacity(x.words.len() + y.words.len() + 2);
    res.words.extend_from_slice(&y.words);
    let mut cursor = WordCursor::new(x);
    cursor.advance_by(y.last / BLOCK_BITS + 1);
    cursor.flush_into(&mut res, x.last);
    res.size = match (x.size.get(), y.size.get()) {
        (Some(p), Some(q)) => Cell::new(Some(p + q)),
        _ => Cell::new(None),
    };
    res.compact_words();
    Some(res)
}

fn xor_one_way(x: &ConciseSet, y: &ConciseSet) -> Option<ConciseSet> {
    if !covers(x, y) {
        return None;
    }
    if is_zero_sequence(x.words[0]) {
        // y is unchanged under xor with x's zero run.
        return or_one_way(x, y);
    }
    // y must be complemented inside x's one run; no shortcut.
    None
}

fn general(a: &ConciseSet, b: &ConciseSet, op: Operator) -> ConciseSet {
    let mut res = a.empty_like();

    // Upper bound for the result: one word per operand word plus merge
    // slack, but never more than the uncompressed representation (which
    // can double in WAH mode, where single-bit blocks cost two words).
    let dense = ((a.last.max(b.last) / BLOCK_BITS) as usize) << (a.wah as usize);
    let cap = 1 + (a.words.len() + b.words.len() + 2).min(dense);
    res.words = Vec::with_capacity(cap);

    let mut ai = WordCursor::new(a);
    let mut bi = WordCursor::new(b);
    loop {
        let (a_more, b_more) = if !ai.is_literal {
            if !bi.is_literal {
                let k = ai.count.min(bi.count);
                res.append_fill(k, op.combine_literals(ai.word, bi.word));
                (ai.advance_by(k), bi.advance_by(k))
            } else {
                res.append_literal(op.combine_literals(ai.fill_block_literal(), bi.word));
                (ai.advance_by(1), bi.advance())
            }
        } else if !bi.is_literal {
            res.append_literal(op.combine_literals(ai.word, bi.fill_block_literal()));
            (ai.advance(), bi.advance_by(1))
        } else {
            res.append_literal(op.combine_literals(ai.word, bi.word));
            (ai.advance(), bi.advance())
        };
        if !a_more || !b_more {
            break;
        }
    }

    res.size = Cell::new(None);
    let mut invalid_last = true;

    // One operand may extend past the other; the tail treatment depends
    // on the operator.
    match op {
        Operator::And => {}
        Operator::Or => {
            res.last = a.last.max(b.last);
            invalid_last = false;
            invalid_last |= ai.flush_into(&mut res, a.last);
            invalid_last |= bi.flush_into(&mut res, b.last);
        }
        Operator::Xor => {
            if a.last != b.last {
                res.last = a.last.max(b.last);
                invalid_last = false;
            }
            invalid_last |= ai.flush_into(&mut res, a.last);
            invalid_last |= bi.flush_into(&mut res, b.last);
        }
        Operator::AndNot => {
            if a.last > b.last {
                res.last = a.last;
                invalid_last = false;
            }
            invalid_last |= ai.flush_into(&mut res, a.last);
        }
    }

    res.trim_zeros();
    if res.is_empty() {
        return res;
    }
    if invalid_last {
        res.update_last();
    }
    res.compact_words();
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(elements: &[u32]) -> ConciseSet {
        elements.iter().copied().collect()
    }

    #[test]
    fn test_combiner_truth_tables() {
        let a = 0x8000_0F0Fu32;
        let b = 0x8000_00FFu32;
        assert_eq!(Operator::And.combine_literals(a, b), 0x8000_000F);
        assert_eq!(Operator::Or.combine_literals(a, b), 0x8000_0FFF);
        assert_eq!(Operator::Xor.combine_literals(a, b), 0x8000_0FF0);
        assert_eq!(Operator::AndNot.combine_literals(a, b), 0x8000_0F00);
    }

    #[test]
    fn test_empty_operands() {
        let empty = ConciseSet::new();
        let s = set(&[1, 5, 9]);
        assert!(perform(&empty, &s, Operator::And).is_empty());
        assert_eq!(perform(&empty, &s, Operator::Or), s);
        assert_eq!(perform(&s, &empty, Operator::Xor), s);
        assert_eq!(perform(&s, &empty, Operator::AndNot), s);
        assert!(perform(&empty, &s, Operator::AndNot).is_empty());
    }

    #[test]
    fn test_disjoint_zero_run_cover() {
        // b opens with a zero run wider than a's span.
        let a = set(&(0..=30).collect::<Vec<_>>());
        let b = set(&[1000, 1001]);
        assert!(perform(&a, &b, Operator::And).is_empty());

        let union = perform(&a, &b, Operator::Or);
        assert_eq!(union.to_vec(), {
            let mut v: Vec<u32> = (0..=30).collect();
            v.extend([1000, 1001]);
            v
        });
        assert_eq!(union.words().len(), 3);

        assert_eq!(perform(&a, &b, Operator::AndNot), a);
    }

    #[test]
    fn test_disjoint_one_run_cover() {
        let a = set(&(0..=99).collect::<Vec<_>>());
        let b = set(&[3, 40]);
        assert_eq!(perform(&a, &b, Operator::And), b);
        assert_eq!(perform(&a, &b, Operator::Or), a);
        assert!(perform(&b, &a, Operator::AndNot).is_empty());
    }

    #[test]
    fn test_xor_interleaved() {
        let a = set(&[0, 31, 62]);
        let b = set(&[31, 62, 93]);
        assert_eq!(perform(&a, &b, Operator::Xor).to_vec(), vec![0, 93]);
    }

    #[test]
    fn test_tail_flush_recomputes_maximum() {
        let a = set(&[2, 5]);
        let b = set(&[2, 5, 1000]);
        // a xor b leaves only the tail beyond a's maximum.
        assert_eq!(perform(&a, &b, Operator::Xor).to_vec(), vec![1000]);
        // andnot discards b's tail entirely.
        assert!(perform(&a, &b, Operator::AndNot).is_empty());
        assert_eq!(perform(&b, &a, Operator::AndNot).to_vec(), vec![1000]);
    }
}
