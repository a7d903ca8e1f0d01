//! Per-sentence phrase candidates, phrase-table pruning and the future-score
//! table.
//!
//! Candidates live in a triangular `spans[start][len - 1]` array and are
//! shared with hypotheses through `Rc`; they never change once the index is
//! built.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::coverage::Range;
use crate::logprob::{log_add, LOG_ZERO};
use crate::vocab::WordId;

/// Where a candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateOrigin {
    PhraseTable,
    Marked,
    /// Source word copied through untranslated.
    CopyThrough,
    /// Placeholder phrase of the initial hypothesis.
    Root,
}

/// One possible translation of a contiguous source span.
#[derive(Debug, Clone, PartialEq)]
pub struct PhraseCandidate {
    pub span: Range,
    pub target: Vec<WordId>,
    pub backward: Vec<f64>,
    pub forward: Vec<f64>,
    pub adir: Vec<f64>,
    /// Weighted translation scores plus phrase-internal LM and feature
    /// heuristics. Drives pruning and the future-score table.
    pub partial_score: f64,
    pub origin: CandidateOrigin,
}

impl PhraseCandidate {
    /// The zero-width phrase the initial hypothesis carries.
    pub fn root() -> Self {
        Self {
            span: Range::EMPTY,
            target: Vec::new(),
            backward: Vec::new(),
            forward: Vec::new(),
            adir: Vec::new(),
            partial_score: 0.0,
            origin: CandidateOrigin::Root,
        }
    }

    pub fn is_copy_through(&self) -> bool {
        self.origin == CandidateOrigin::CopyThrough
    }
}

/// Deterministic candidate order: higher score first, then shorter target,
/// then smaller target ids.
pub fn rank_candidates(a_score: f64, a: &PhraseCandidate, b_score: f64, b: &PhraseCandidate) -> Ordering {
    b_score
        .total_cmp(&a_score)
        .then_with(|| a.target.len().cmp(&b.target.len()))
        .then_with(|| a.target.cmp(&b.target))
}

/// Prunes one span's candidate list in place.
///
/// First drops candidates scoring below `log_threshold`, keeping the single
/// best one if nothing would survive. Then keeps the `size_limit` best
/// (0 = no limit). Survivors come back sorted best first.
pub fn apply_phrase_table_pruning<F>(
    candidates: &mut Vec<PhraseCandidate>,
    size_limit: usize,
    log_threshold: f64,
    score: F,
) where
    F: Fn(&PhraseCandidate) -> f64,
{
    if candidates.is_empty() {
        return;
    }
    let mut scored: Vec<(f64, PhraseCandidate)> =
        candidates.drain(..).map(|c| (score(&c), c)).collect();
    let cmp = |a: &(f64, PhraseCandidate), b: &(f64, PhraseCandidate)| {
        rank_candidates(a.0, &a.1, b.0, &b.1)
    };

    if log_threshold > LOG_ZERO {
        let survivors = scored.iter().filter(|(s, _)| *s >= log_threshold).count();
        if survivors == 0 {
            // never prune a span down to nothing
            let best = scored
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| cmp(a, b))
                .map(|(i, _)| i)
                .unwrap_or(0);
            let kept = scored.swap_remove(best);
            scored.clear();
            scored.push(kept);
        } else {
            scored.retain(|(s, _)| *s >= log_threshold);
        }
    }

    if size_limit > 0 && scored.len() > size_limit {
        scored.select_nth_unstable_by(size_limit - 1, cmp);
        scored.truncate(size_limit);
    }
    scored.sort_by(cmp);
    candidates.extend(scored.into_iter().map(|(_, c)| c));
}

/// Best achievable partial score for every span, translated in isolation.
#[derive(Debug, Clone)]
pub struct FutureScoreTable {
    table: Vec<Vec<f64>>,
}

impl FutureScoreTable {
    /// Fills the table by dynamic programming over span length: a span is
    /// worth its best candidate or its best split into two sub-spans.
    pub fn compute(spans: &[Vec<Vec<Rc<PhraseCandidate>>>]) -> Self {
        let n = spans.len();
        let mut table: Vec<Vec<f64>> = (0..n).map(|i| vec![LOG_ZERO; n - i]).collect();
        for len in 1..=n {
            for i in 0..=n - len {
                let mut best = spans[i][len - 1]
                    .iter()
                    .map(|c| c.partial_score)
                    .fold(LOG_ZERO, f64::max);
                for k in i + 1..i + len {
                    let split = log_add(table[i][k - i - 1], table[k][i + len - k - 1]);
                    best = best.max(split);
                }
                table[i][len - 1] = best;
            }
        }
        Self { table }
    }

    /// Future score of `span`; 0 for an empty span, `LOG_ZERO` outside the
    /// sentence.
    pub fn get(&self, span: Range) -> f64 {
        if span.is_empty() {
            return 0.0;
        }
        self.table
            .get(span.start)
            .and_then(|row| row.get(span.len() - 1))
            .copied()
            .unwrap_or(LOG_ZERO)
    }

    pub fn source_len(&self) -> usize {
        self.table.len()
    }
}

/// Candidates per source span plus the derived future-score table.
#[derive(Debug, Clone)]
pub struct PhraseCandidateIndex {
    spans: Vec<Vec<Vec<Rc<PhraseCandidate>>>>,
    future: FutureScoreTable,
    oovs: Vec<bool>,
}

impl PhraseCandidateIndex {
    /// `spans[i][len - 1]` holds the candidates for `[i, i + len)`.
    pub fn new(spans: Vec<Vec<Vec<PhraseCandidate>>>, oovs: Vec<bool>) -> Self {
        let spans: Vec<Vec<Vec<Rc<PhraseCandidate>>>> = spans
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|list| list.into_iter().map(Rc::new).collect())
                    .collect()
            })
            .collect();
        let future = FutureScoreTable::compute(&spans);
        Self {
            spans,
            future,
            oovs,
        }
    }

    pub fn source_len(&self) -> usize {
        self.spans.len()
    }

    pub fn candidates(&self, span: Range) -> &[Rc<PhraseCandidate>] {
        if span.is_empty() {
            return &[];
        }
        self.spans
            .get(span.start)
            .and_then(|row| row.get(span.len() - 1))
            .map_or(&[], Vec::as_slice)
    }

    pub fn has_candidates(&self, span: Range) -> bool {
        !self.candidates(span).is_empty()
    }

    pub fn future_score_for(&self, span: Range) -> f64 {
        self.future.get(span)
    }

    pub fn future_table(&self) -> &FutureScoreTable {
        &self.future
    }

    /// Positions that only have a copy-through candidate.
    pub fn oovs(&self) -> &[bool] {
        &self.oovs
    }

    /// Every non-empty span with its candidates, by start then length.
    pub fn iter_spans(&self) -> impl Iterator<Item = (Range, &[Rc<PhraseCandidate>])> + '_ {
        self.spans.iter().enumerate().flat_map(|(i, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, list)| !list.is_empty())
                .map(move |(l, list)| (Range::new(i, i + l + 1), list.as_slice()))
        })
    }

    pub fn num_candidates(&self) -> usize {
        self.spans.iter().flatten().map(Vec::len).sum()
    }

    /// Checks that some chain of candidate spans covers the whole sentence.
    /// On failure returns the furthest position such a chain reaches.
    pub fn check_coverable(&self) -> Result<(), usize> {
        let n = self.source_len();
        let mut reach = vec![false; n + 1];
        reach[0] = true;
        for i in 0..n {
            if !reach[i] {
                continue;
            }
            for (l, list) in self.spans[i].iter().enumerate() {
                if !list.is_empty() {
                    reach[i + l + 1] = true;
                }
            }
        }
        if reach[n] {
            Ok(())
        } else {
            Err(reach.iter().rposition(|&r| r).unwrap_or(0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cand(start: usize, end: usize, target: &[WordId], score: f64) -> PhraseCandidate {
        PhraseCandidate {
            span: Range::new(start, end),
            target: target.to_vec(),
            backward: vec![score],
            forward: Vec::new(),
            adir: Vec::new(),
            partial_score: score,
            origin: CandidateOrigin::PhraseTable,
        }
    }

    fn empty_spans(n: usize) -> Vec<Vec<Vec<PhraseCandidate>>> {
        (0..n).map(|i| vec![Vec::new(); n - i]).collect()
    }

    #[test]
    fn threshold_keeps_best_when_everything_fails() {
        let mut list = vec![cand(0, 1, &[2], -5.0), cand(0, 1, &[3], -4.0)];
        apply_phrase_table_pruning(&mut list, 0, (0.5f64).ln(), |c| c.partial_score);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].target, vec![3]);
    }

    #[test]
    fn threshold_then_limit() {
        let mut list = vec![
            cand(0, 1, &[2], -0.1),
            cand(0, 1, &[3], -3.0),
            cand(0, 1, &[4], -0.2),
            cand(0, 1, &[5], -0.3),
        ];
        apply_phrase_table_pruning(&mut list, 2, (0.1f64).ln(), |c| c.partial_score);
        let targets: Vec<WordId> = list.iter().map(|c| c.target[0]).collect();
        assert_eq!(targets, vec![2, 4]);
    }

    #[test]
    fn ties_break_on_target_length_then_ids() {
        let mut list = vec![
            cand(0, 1, &[9, 9], -1.0),
            cand(0, 1, &[8], -1.0),
            cand(0, 1, &[7], -1.0),
        ];
        apply_phrase_table_pruning(&mut list, 2, LOG_ZERO, |c| c.partial_score);
        let targets: Vec<Vec<WordId>> = list.iter().map(|c| c.target.clone()).collect();
        assert_eq!(targets, vec![vec![7], vec![8]]);
    }

    #[test]
    fn future_table_prefers_splits_when_better() {
        let mut spans = empty_spans(3);
        spans[0][0].push(cand(0, 1, &[2], -1.0));
        spans[1][0].push(cand(1, 2, &[3], -1.0));
        spans[2][0].push(cand(2, 3, &[4], -1.0));
        spans[0][1].push(cand(0, 2, &[5], -1.5));
        spans[1][1].push(cand(1, 3, &[6], -2.5));
        let index = PhraseCandidateIndex::new(spans, vec![false; 3]);
        let t = index.future_table();
        assert_eq!(t.get(Range::new(0, 2)), -1.5);
        assert_eq!(t.get(Range::new(1, 3)), -2.0);
        assert_eq!(t.get(Range::new(0, 3)), -2.5);
        assert_eq!(t.get(Range::new(2, 2)), 0.0);
        assert_eq!(t.get(Range::new(2, 9)), LOG_ZERO);
    }

    #[test]
    fn coverable_reports_stuck_position() {
        let mut spans = empty_spans(3);
        spans[0][1].push(cand(0, 2, &[2], -1.0));
        let index = PhraseCandidateIndex::new(spans, vec![false; 3]);
        assert_eq!(index.check_coverable(), Err(2));
        assert_eq!(index.future_score_for(Range::new(0, 3)), LOG_ZERO);
        assert_eq!(index.iter_spans().count(), 1);
        assert_eq!(index.num_candidates(), 1);
    }

    // Best partial-score sum over every segmentation, by plain recursion.
    fn brute_force(spans: &[Vec<Vec<PhraseCandidate>>], start: usize, n: usize) -> f64 {
        if start == n {
            return 0.0;
        }
        let mut best = LOG_ZERO;
        for end in start + 1..=n {
            for c in &spans[start][end - start - 1] {
                best = best.max(log_add(c.partial_score, brute_force(spans, end, n)));
            }
        }
        best
    }

    fn arb_spans() -> impl Strategy<Value = Vec<Vec<Vec<PhraseCandidate>>>> {
        (1usize..=5)
            .prop_flat_map(|n| {
                prop::collection::vec(
                    (0..n, 1usize..=3, -5.0f64..0.0),
                    0..12,
                )
                .prop_map(move |raw| (n, raw))
            })
            .prop_map(|(n, raw)| {
                let mut spans = empty_spans(n);
                // single-word coverage always exists, like the copy-through fallback
                for i in 0..n {
                    spans[i][0].push(cand(i, i + 1, &[1], -10.0));
                }
                for (start, len, score) in raw {
                    let end = (start + len).min(n);
                    spans[start][end - start - 1].push(cand(start, end, &[2], score));
                }
                spans
            })
    }

    proptest! {
        #[test]
        fn future_table_matches_brute_force(spans in arb_spans()) {
            let n = spans.len();
            let expected = brute_force(&spans, 0, n);
            let index = PhraseCandidateIndex::new(spans, vec![false; n]);
            let got = index.future_score_for(Range::new(0, n));
            prop_assert!(got.is_finite());
            prop_assert!((got - expected).abs() < 1e-9, "dp {} vs brute force {}", got, expected);
        }

        #[test]
        fn pruning_never_empties_a_span(
            scores in prop::collection::vec(-20.0f64..0.0, 1..10),
            threshold in 0.0001f64..1.0,
            limit in 0usize..4,
        ) {
            let mut list: Vec<PhraseCandidate> = scores
                .iter()
                .enumerate()
                .map(|(i, &s)| cand(0, 1, &[i as WordId], s))
                .collect();
            let before = list.len();
            apply_phrase_table_pruning(&mut list, limit, threshold.ln(), |c| c.partial_score);
            prop_assert!(!list.is_empty());
            prop_assert!(list.len() <= before);
            if limit > 0 {
                prop_assert!(list.len() <= limit);
            }
            prop_assert!(list.windows(2).all(|w| w[0].partial_score >= w[1].partial_score));
        }
    }
}
