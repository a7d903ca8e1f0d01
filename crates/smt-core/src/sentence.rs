//! Per-sentence decoder input: tokens, marked translations and walls.

use crate::coverage::Range;

/// A user-supplied translation for an exact source span, overriding or
/// supplementing the phrase table.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkedTranslation {
    pub span: Range,
    /// One or more alternative target token sequences.
    pub targets: Vec<Vec<String>>,
    /// Natural-log probability given to every alternative.
    pub log_prob: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceSentence {
    pub tokens: Vec<String>,
    pub marks: Vec<MarkedTranslation>,
    /// Wall positions: every source position before a wall must be
    /// translated before any position at or after it.
    pub walls: Vec<usize>,
}

impl SourceSentence {
    pub fn new<S: Into<String>>(tokens: impl IntoIterator<Item = S>) -> Self {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            marks: Vec::new(),
            walls: Vec::new(),
        }
    }

    /// Splits on whitespace.
    pub fn from_text(text: &str) -> Self {
        Self::new(text.split_whitespace())
    }

    pub fn with_mark(mut self, mark: MarkedTranslation) -> Self {
        self.marks.push(mark);
        self
    }

    pub fn with_wall(mut self, pos: usize) -> Self {
        self.walls.push(pos);
        self
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The same sentence read right to left, for backwards decoding.
    pub fn reversed(&self) -> Self {
        let n = self.len();
        let mut walls: Vec<usize> = self.walls.iter().map(|&w| n.saturating_sub(w)).collect();
        walls.sort_unstable();
        Self {
            tokens: self.tokens.iter().rev().cloned().collect(),
            marks: self
                .marks
                .iter()
                .map(|m| MarkedTranslation {
                    span: m.span.mirror(n),
                    targets: m
                        .targets
                        .iter()
                        .map(|t| t.iter().rev().cloned().collect())
                        .collect(),
                    log_prob: m.log_prob,
                })
                .collect(),
            walls,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reversed_mirrors_everything() {
        let s = SourceSentence::from_text("a b c d")
            .with_mark(MarkedTranslation {
                span: Range::new(0, 2),
                targets: vec![vec!["x".into(), "y".into()]],
                log_prob: -1.0,
            })
            .with_wall(1);
        let r = s.reversed();
        assert_eq!(r.tokens, vec!["d", "c", "b", "a"]);
        assert_eq!(r.marks[0].span, Range::new(2, 4));
        assert_eq!(r.marks[0].targets[0], vec!["y", "x"]);
        assert_eq!(r.walls, vec![3]);
        assert_eq!(r.reversed(), s);
    }
}
