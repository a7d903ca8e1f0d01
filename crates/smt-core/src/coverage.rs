//! Source spans and the set of source positions a hypothesis has not yet
//! translated.

use std::fmt;

use serde::Serialize;
use smallvec::SmallVec;

/// Half-open interval `[start, end)` of source positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    /// The zero-width span the initial hypothesis pretends to have translated.
    pub const EMPTY: Range = Range { start: 0, end: 0 };

    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "range start {start} > end {end}");
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// True when `other` lies entirely inside `self`.
    pub fn contains(&self, other: Range) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn overlaps(&self, other: Range) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Span as seen from the other end of a sentence of length `n`.
    pub fn mirror(&self, n: usize) -> Range {
        Range::new(n - self.end, n - self.start)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Sorted, pairwise disjoint, non-adjacent runs of untranslated source
/// positions.
///
/// Two sets compare equal iff they denote the same positions, which is
/// what recombination relies on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct UncoveredSet {
    runs: SmallVec<[Range; 4]>,
}

impl UncoveredSet {
    /// Every position of a sentence of length `n` is uncovered.
    pub fn full(n: usize) -> Self {
        let mut runs = SmallVec::new();
        if n > 0 {
            runs.push(Range::new(0, n));
        }
        Self { runs }
    }

    pub fn runs(&self) -> &[Range] {
        &self.runs
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Number of uncovered positions.
    pub fn count(&self) -> usize {
        self.runs.iter().map(Range::len).sum()
    }

    /// Lowest uncovered position, if any.
    pub fn first(&self) -> Option<usize> {
        self.runs.first().map(|r| r.start)
    }

    /// True when every position of `span` is still uncovered.
    pub fn contains(&self, span: Range) -> bool {
        self.runs.iter().any(|r| r.contains(span))
    }

    pub fn contains_position(&self, pos: usize) -> bool {
        self.runs.iter().any(|r| r.start <= pos && pos < r.end)
    }

    /// The run that `span` falls in.
    pub fn run_containing(&self, span: Range) -> Option<Range> {
        self.runs.iter().copied().find(|r| r.contains(span))
    }

    /// Marks `span` as translated. Positions already covered are ignored.
    pub fn cover(&self, span: Range) -> Self {
        let mut runs = SmallVec::with_capacity(self.runs.len() + 1);
        for r in &self.runs {
            if !r.overlaps(span) {
                runs.push(*r);
                continue;
            }
            if r.start < span.start {
                runs.push(Range::new(r.start, span.start));
            }
            if span.end < r.end {
                runs.push(Range::new(span.end, r.end));
            }
        }
        Self { runs }
    }

    /// Marks `span` as untranslated again, merging with neighbouring runs.
    pub fn uncover(&self, span: Range) -> Self {
        if span.is_empty() {
            return self.clone();
        }
        let mut merged = span;
        let mut runs: SmallVec<[Range; 4]> = SmallVec::with_capacity(self.runs.len() + 1);
        let mut placed = false;
        for r in &self.runs {
            if r.end < merged.start {
                runs.push(*r);
            } else if merged.end < r.start {
                if !placed {
                    runs.push(merged);
                    placed = true;
                }
                runs.push(*r);
            } else {
                merged = Range::new(merged.start.min(r.start), merged.end.max(r.end));
            }
        }
        if !placed {
            runs.push(merged);
        }
        Self { runs }
    }
}

impl fmt::Display for UncoveredSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.runs.iter().map(|r| r.to_string()).collect();
        write!(f, "{{{}}}", parts.join(" "))
    }
}
