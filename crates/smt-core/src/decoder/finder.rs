use crate::candidates::PhraseCandidateIndex;
use crate::coverage::Range;
use crate::hypothesis::Hypothesis;
use crate::settings::DistortionSettings;

use super::distortion::DistortionLimit;

/// Enumerates the spans a hypothesis may translate next.
pub(crate) struct PhraseFinder<'a> {
    index: &'a PhraseCandidateIndex,
    limit: DistortionLimit,
    max_len: usize,
}

impl<'a> PhraseFinder<'a> {
    pub fn new(index: &'a PhraseCandidateIndex, settings: &DistortionSettings) -> Self {
        let max_len = index.iter_spans().map(|(span, _)| span.len()).max().unwrap_or(0);
        Self {
            index,
            limit: DistortionLimit::new(settings),
            max_len,
        }
    }

    /// Uncovered spans of `h` that have candidates and pass the reordering
    /// constraints, by start then end.
    pub fn spans(&self, h: &Hypothesis) -> Vec<Range> {
        let mut out = Vec::new();
        for run in h.uncovered().runs() {
            for start in run.start..run.end {
                let last = run.end.min(start + self.max_len);
                for end in start + 1..=last {
                    let span = Range::new(start, end);
                    if self.index.has_candidates(span) && self.limit.allows(h, span, self.index) {
                        out.push(span);
                    }
                }
            }
        }
        out
    }
}
