use super::DecoderFeature;
use crate::hypothesis::Hypothesis;
use crate::sentence::SourceSentence;

/// Rejects any phrase that reaches past a wall while a position before the
/// wall is still untranslated.
#[derive(Debug, Clone, Default)]
pub struct Walls {
    walls: Vec<usize>,
}

impl DecoderFeature for Walls {
    fn name(&self) -> &str {
        "Walls"
    }

    fn new_source_sentence(&mut self, sentence: &SourceSentence) {
        self.walls = sentence.walls.clone();
    }

    fn score(&self, h: &Hypothesis) -> f64 {
        if h.is_initial() {
            return 0.0;
        }
        let end = h.phrase().span.end;
        let first_gap = h.uncovered().first();
        let crossed = self
            .walls
            .iter()
            .any(|&w| end > w && first_gap.is_some_and(|u| u < w));
        if crossed {
            -1.0
        } else {
            0.0
        }
    }

    fn is_filter(&self) -> bool {
        true
    }

    fn box_clone(&self) -> Box<dyn DecoderFeature> {
        Box::new(self.clone())
    }
}
