use super::{previous_end, DecoderFeature};
use crate::hypothesis::Hypothesis;

/// Cost of visiting the remaining gaps left to right from `h`'s last phrase
/// end, then stepping to the sentence end. `step` prices one jump.
fn gap_traversal(h: &Hypothesis, step: impl Fn(usize, usize) -> f64) -> f64 {
    if h.is_complete() {
        return 0.0;
    }
    let mut pos = h.phrase().span.end;
    let mut cost = 0.0;
    for r in h.uncovered().runs() {
        cost += step(pos, r.start);
        pos = r.end;
    }
    cost + step(pos, h.source_len())
}

fn same_last_end(a: &Hypothesis, b: &Hypothesis) -> bool {
    a.phrase().span.end == b.phrase().span.end
}

/// Minus the number of source words jumped over between consecutive
/// phrases, including the final jump to the sentence end.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordDisplacement;

impl DecoderFeature for WordDisplacement {
    fn name(&self) -> &str {
        "WordDisplacement"
    }

    fn score(&self, h: &Hypothesis) -> f64 {
        if h.is_initial() {
            return 0.0;
        }
        let span = h.phrase().span;
        let mut jump = span.start.abs_diff(previous_end(h));
        if h.is_complete() {
            jump += h.source_len().abs_diff(span.end);
        }
        -(jump as f64)
    }

    fn future_score(&self, h: &Hypothesis) -> f64 {
        -gap_traversal(h, |from, to| from.abs_diff(to) as f64)
    }

    fn recomb_hash(&self, h: &Hypothesis) -> u64 {
        h.phrase().span.end as u64
    }

    fn is_recombinable(&self, a: &Hypothesis, b: &Hypothesis) -> bool {
        same_last_end(a, b)
    }

    fn box_clone(&self) -> Box<dyn DecoderFeature> {
        Box::new(*self)
    }
}

/// Minus one per discontinuous phrase transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhraseDisplacement;

impl DecoderFeature for PhraseDisplacement {
    fn name(&self) -> &str {
        "PhraseDisplacement"
    }

    fn score(&self, h: &Hypothesis) -> f64 {
        if h.is_initial() {
            return 0.0;
        }
        let span = h.phrase().span;
        let mut jumps = usize::from(span.start != previous_end(h));
        if h.is_complete() && span.end != h.source_len() {
            jumps += 1;
        }
        -(jumps as f64)
    }

    fn future_score(&self, h: &Hypothesis) -> f64 {
        -gap_traversal(h, |from, to| if from == to { 0.0 } else { 1.0 })
    }

    fn recomb_hash(&self, h: &Hypothesis) -> u64 {
        h.phrase().span.end as u64
    }

    fn is_recombinable(&self, a: &Hypothesis, b: &Hypothesis) -> bool {
        same_last_end(a, b)
    }

    fn box_clone(&self) -> Box<dyn DecoderFeature> {
        Box::new(*self)
    }
}

/// Minus the distance from the first gap to the start of the new phrase.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeftDistance;

impl DecoderFeature for LeftDistance {
    fn name(&self) -> &str {
        "LeftDistance"
    }

    fn score(&self, h: &Hypothesis) -> f64 {
        let Some(back) = h.back() else {
            return 0.0;
        };
        let start = h.phrase().span.start;
        let first_gap = back.uncovered().first().unwrap_or(start);
        -(start.saturating_sub(first_gap) as f64)
    }

    fn box_clone(&self) -> Box<dyn DecoderFeature> {
        Box::new(*self)
    }
}

/// Always 0; holds a weight slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroInfo;

impl DecoderFeature for ZeroInfo {
    fn name(&self) -> &str {
        "ZeroInfo"
    }

    fn score(&self, _h: &Hypothesis) -> f64 {
        0.0
    }

    fn box_clone(&self) -> Box<dyn DecoderFeature> {
        Box::new(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{path, phrase};

    #[test]
    fn word_displacement_counts_jumps() {
        // n = 4: [2,4) then [0,2)
        let hs = path(4, &[phrase(2, 4, &[5]), phrase(0, 2, &[6])]);
        let f = WordDisplacement;
        assert_eq!(f.score(&hs[0]), 0.0);
        assert_eq!(f.score(&hs[1]), -2.0);
        // jump back 4 -> 0, then 2 -> 4 at the end
        assert_eq!(f.score(&hs[2]), -6.0);
        assert_eq!(f.future_score(&hs[2]), 0.0);
        // from end 4: to gap 0 costs 4, gap end 2 to sentence end costs 2
        assert_eq!(f.future_score(&hs[1]), -6.0);
        assert_eq!(f.future_score(&hs[0]), 0.0);
    }

    #[test]
    fn word_displacement_future_matches_monotone_completion() {
        let hs = path(3, &[phrase(0, 1, &[5]), phrase(1, 2, &[6]), phrase(2, 3, &[7])]);
        let f = WordDisplacement;
        for h in &hs {
            assert_eq!(f.future_score(h), 0.0);
            assert_eq!(f.score(h), 0.0);
        }
    }

    #[test]
    fn phrase_displacement_counts_discontinuities() {
        let hs = path(4, &[phrase(2, 4, &[5]), phrase(0, 2, &[6])]);
        let f = PhraseDisplacement;
        assert_eq!(f.score(&hs[1]), -1.0);
        assert_eq!(f.future_score(&hs[1]), -2.0);
        assert_eq!(f.score(&hs[2]), -2.0);
        assert_eq!(f.future_score(&hs[2]), 0.0);
    }

    #[test]
    fn recombination_needs_same_last_end() {
        let a = path(4, &[phrase(0, 1, &[5]), phrase(1, 2, &[6])]);
        let b = path(4, &[phrase(1, 2, &[5]), phrase(0, 1, &[6])]);
        let f = WordDisplacement;
        assert_eq!(a[2].uncovered(), b[2].uncovered());
        assert!(!f.is_recombinable(&a[2], &b[2]));
        assert!(f.is_recombinable(&a[2], &a[2]));
    }

    #[test]
    fn left_distance_measures_from_first_gap() {
        let hs = path(5, &[phrase(3, 4, &[5]), phrase(0, 1, &[6])]);
        let f = LeftDistance;
        assert_eq!(f.score(&hs[1]), -3.0);
        assert_eq!(f.score(&hs[2]), 0.0);
        assert_eq!(ZeroInfo.score(&hs[1]), 0.0);
    }
}
