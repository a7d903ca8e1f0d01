//! Reordering constraints: the distortion limit in its three definitions,
//! the phrase-swap relaxation and the ITG check.

use crate::candidates::PhraseCandidateIndex;
use crate::coverage::{Range, UncoveredSet};
use crate::hypothesis::Hypothesis;
use crate::settings::{DistLimitVariant, DistortionSettings};

#[derive(Debug, Clone, Copy)]
pub(crate) struct DistortionLimit {
    limit: Option<usize>,
    variant: DistLimitVariant,
    phrase_swap: bool,
    itg_limit: Option<usize>,
}

impl DistortionLimit {
    pub fn new(settings: &DistortionSettings) -> Self {
        Self {
            limit: settings.limit(),
            variant: settings.variant,
            phrase_swap: settings.phrase_swap,
            itg_limit: settings.itg_limit(),
        }
    }

    /// Whether `span`, wholly uncovered in `h`, may be translated next.
    pub fn allows(&self, h: &Hypothesis, span: Range, index: &PhraseCandidateIndex) -> bool {
        if let Some(sr) = h.shift_reducer() {
            if !sr.allows(span, h.uncovered(), self.itg_limit) {
                return false;
            }
        }
        self.within_limit(h, span) || (self.phrase_swap && swap_allows(h, span, index))
    }

    fn within_limit(&self, h: &Hypothesis, span: Range) -> bool {
        let Some(l) = self.limit else {
            return true;
        };
        let prev_end = h.phrase().span.end;
        match self.variant {
            DistLimitVariant::Simple => {
                let first_gap = h.uncovered().first().unwrap_or(span.start);
                span.start <= first_gap + l
            }
            DistLimitVariant::Standard => {
                if span.start.abs_diff(prev_end) > l {
                    return false;
                }
                match h.uncovered().cover(span).first() {
                    None => true,
                    Some(u) => span.end <= u + l,
                }
            }
            DistLimitVariant::Extended => {
                if span.start.abs_diff(prev_end) > l {
                    return false;
                }
                let after = h.uncovered().cover(span);
                match after.first() {
                    None => true,
                    Some(u) => span.start <= u + l && can_reach_first_gap(&after, span.end, l),
                }
            }
        }
    }
}

/// Whether single-word back-jumps of at most `l` can lead from `from` to
/// the first gap of `uncovered`.
fn can_reach_first_gap(uncovered: &UncoveredSet, from: usize, l: usize) -> bool {
    let mut remaining = uncovered.clone();
    let mut pos = from;
    loop {
        let Some(u) = remaining.first() else {
            return true;
        };
        if u >= pos || pos - u <= l {
            return true;
        }
        // leftmost stepping stone within reach
        let Some(x) = (pos - l..pos).find(|&x| remaining.contains_position(x)) else {
            return false;
        };
        remaining = remaining.cover(Range::new(x, x + 1));
        pos = x + 1;
    }
}

/// Phrase swap: translating a phrase before the phrase right in front of
/// it, then going back, is always allowed.
///
/// - more than two gaps: never
/// - one gap reaching the sentence end: the new phrase may start anywhere
///   in it as long as the words it skips can be translated as one phrase
/// - otherwise: the new phrase must fill the first gap exactly, right
///   after a last phrase that ended where the next gap (or the sentence)
///   starts
fn swap_allows(h: &Hypothesis, span: Range, index: &PhraseCandidateIndex) -> bool {
    let n = h.source_len();
    match h.uncovered().runs() {
        [run] if run.end == n => {
            span.start == run.start
                || (span.start > run.start && index.has_candidates(Range::new(run.start, span.start)))
        }
        [first, rest @ ..] if rest.len() <= 1 => {
            let next = rest.first().map_or(n, |r| r.start);
            span == *first && h.phrase().span == Range::new(first.end, next)
        }
        _ => false,
    }
}
