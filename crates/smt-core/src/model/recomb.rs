//! Recombination keys: the part of a hypothesis that future scoring can
//! still see.

use crate::hypothesis::{Context, Hypothesis};

const LM_PRIME: u64 = 31;
const COVERAGE_PRIME: u64 = 37;
const SHIFT_REDUCE_PRIME: u64 = 41;
const FEATURE_PRIME: u64 = 43;

fn fold(acc: u64, value: u64, prime: u64) -> u64 {
    acc.wrapping_mul(prime).wrapping_add(value)
}

/// Number of trailing target words that determine future LM scores.
pub(super) fn context_len(h: &Hypothesis, lm_numwords: usize, cap: Option<usize>) -> usize {
    let full = lm_numwords.saturating_sub(1);
    let len = h.lm_context_size().unwrap_or(full).min(full);
    cap.map_or(len, |c| len.min(c))
}

pub(super) fn base_hash(h: &Hypothesis, context: &Context, context_len: usize) -> u64 {
    let mut acc = context
        .iter()
        .fold(0u64, |acc, &w| fold(acc, u64::from(w), LM_PRIME));
    acc = fold(acc, context_len as u64, LM_PRIME);
    for r in h.uncovered().runs() {
        acc = fold(acc, r.start as u64, COVERAGE_PRIME);
        acc = fold(acc, r.end as u64, COVERAGE_PRIME);
    }
    if let Some(sr) = h.shift_reducer() {
        acc = fold(acc, sr.recomb_hash(), SHIFT_REDUCE_PRIME);
    }
    acc
}

pub(super) fn fold_feature(acc: u64, feature_hash: u64) -> u64 {
    fold(acc, feature_hash, FEATURE_PRIME)
}

/// Coverage, LM context and shift-reduce state all match.
pub(super) fn base_equal(a: &Hypothesis, b: &Hypothesis, lm_numwords: usize, cap: Option<usize>) -> bool {
    let len = context_len(a, lm_numwords, cap);
    len == context_len(b, lm_numwords, cap)
        && a.uncovered() == b.uncovered()
        && a.shift_reducer() == b.shift_reducer()
        && a.context_words(len) == b.context_words(len)
}
