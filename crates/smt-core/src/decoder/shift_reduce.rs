//! Shift-reduce parser state for the ITG reordering constraint.
//!
//! The stack holds maximal blocks of contiguous covered source positions in
//! the order they were built. A new phrase is shifted on top, then the top
//! two blocks merge while they are adjacent. A phrase is only admissible
//! when it can still end up merged with the top block, which rules out the
//! 2-4-1-3 and 3-1-4-2 patterns ITG cannot produce.

use smallvec::SmallVec;

use crate::coverage::{Range, UncoveredSet};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ShiftReducer {
    stack: SmallVec<[Range; 4]>,
}

impl ShiftReducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocks(&self) -> &[Range] {
        &self.stack
    }

    pub fn top(&self) -> Option<Range> {
        self.stack.last().copied()
    }

    /// The state after covering `span`.
    pub fn shift(&self, span: Range) -> Self {
        let mut stack = self.stack.clone();
        stack.push(span);
        while stack.len() >= 2 {
            let top = stack[stack.len() - 1];
            let below = stack[stack.len() - 2];
            if below.end == top.start || top.end == below.start {
                stack.pop();
                stack.pop();
                stack.push(Range::new(below.start.min(top.start), below.end.max(top.end)));
            } else {
                break;
            }
        }
        Self { stack }
    }

    /// Whether `span` may be translated next.
    ///
    /// It must lie in the uncovered run touching the top block, and with a
    /// `limit` its gap to the top block must not exceed it.
    pub fn allows(&self, span: Range, uncovered: &UncoveredSet, limit: Option<usize>) -> bool {
        let Some(top) = self.top() else {
            return true;
        };
        let left = uncovered.runs().iter().find(|r| r.end == top.start);
        let right = uncovered.runs().iter().find(|r| r.start == top.end);
        let distance = if left.is_some_and(|r| r.contains(span)) {
            top.start - span.end
        } else if right.is_some_and(|r| r.contains(span)) {
            span.start - top.end
        } else {
            return false;
        };
        limit.map_or(true, |l| distance <= l)
    }

    pub fn recomb_hash(&self) -> u64 {
        self.stack.iter().fold(0u64, |acc, r| {
            acc.wrapping_mul(53)
                .wrapping_add(r.start as u64)
                .wrapping_mul(53)
                .wrapping_add(r.end as u64)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replays a permutation of single words, returning false at the first
    /// rejected step.
    fn accepts(order: &[usize], limit: Option<usize>) -> bool {
        let n = order.len();
        let mut sr = ShiftReducer::new();
        let mut uncovered = UncoveredSet::full(n);
        for &p in order {
            let span = Range::new(p, p + 1);
            if !sr.allows(span, &uncovered, limit) {
                return false;
            }
            sr = sr.shift(span);
            uncovered = uncovered.cover(span);
        }
        assert_eq!(sr.blocks(), &[Range::new(0, n)]);
        true
    }

    #[test]
    fn rejects_non_itg_permutations() {
        assert!(!accepts(&[1, 3, 0, 2], None));
        assert!(!accepts(&[2, 0, 3, 1], None));
    }

    #[test]
    fn accepts_itg_permutations() {
        for order in [
            [0, 1, 2, 3],
            [3, 2, 1, 0],
            [1, 3, 2, 0],
            [0, 3, 1, 2],
            [2, 0, 1, 3],
            [1, 0, 3, 2],
        ] {
            assert!(accepts(&order, None), "{order:?}");
        }
    }

    #[test]
    fn limit_bounds_jump_from_top_block() {
        assert!(accepts(&[0, 3, 1, 2], Some(2)));
        assert!(!accepts(&[0, 3, 1, 2], Some(1)));
        assert!(accepts(&[0, 1, 2, 3], Some(0)));
    }

    #[test]
    fn shift_merges_adjacent_blocks() {
        let sr = ShiftReducer::new()
            .shift(Range::new(2, 3))
            .shift(Range::new(0, 1));
        assert_eq!(sr.blocks().len(), 2);
        let merged = sr.shift(Range::new(1, 2));
        assert_eq!(merged.blocks(), &[Range::new(0, 3)]);
        assert_ne!(sr.recomb_hash(), merged.recomb_hash());
    }
}
