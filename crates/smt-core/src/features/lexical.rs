use rustc_hash::FxHashMap;

use super::{bad_arg, DecoderFeature};
use crate::candidates::PhraseCandidate;
use crate::hypothesis::Hypothesis;
use crate::settings::SettingsError;
use crate::vocab::{Vocabulary, WordId};

/// Word penalty: the number of target words produced.
#[derive(Debug, Clone, Copy, Default)]
pub struct Length;

impl DecoderFeature for Length {
    fn name(&self) -> &str {
        "Length"
    }

    fn precompute_future_score(&self, phrase: &PhraseCandidate) -> f64 {
        phrase.target.len() as f64
    }

    fn score(&self, h: &Hypothesis) -> f64 {
        h.phrase().target.len() as f64
    }

    fn box_clone(&self) -> Box<dyn DecoderFeature> {
        Box::new(*self)
    }
}

/// Sum of per-word indicator weights over the target words of the last
/// phrase. Words without a weight count 0.
#[derive(Debug, Clone, Default)]
pub struct SparseIndicator {
    weights: FxHashMap<WordId, f64>,
}

impl SparseIndicator {
    pub fn new(weights: FxHashMap<WordId, f64>) -> Self {
        Self { weights }
    }

    /// Parses `word=weight,word=weight`.
    pub(crate) fn from_arg(arg: Option<&str>, vocab: &Vocabulary) -> Result<Self, SettingsError> {
        let raw = arg.ok_or_else(|| bad_arg("sparse", "missing word=weight list"))?;
        let mut weights = FxHashMap::default();
        for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (word, value) = item
                .split_once('=')
                .ok_or_else(|| bad_arg("sparse", format!("expected word=weight, got {item}")))?;
            let value: f64 = value
                .trim()
                .parse()
                .map_err(|_| bad_arg("sparse", format!("bad weight in {item}")))?;
            weights.insert(vocab.add(word.trim()), value);
        }
        Ok(Self { weights })
    }

    fn phrase_score(&self, target: &[WordId]) -> f64 {
        target.iter().filter_map(|w| self.weights.get(w)).sum()
    }
}

impl DecoderFeature for SparseIndicator {
    fn name(&self) -> &str {
        "Sparse"
    }

    fn precompute_future_score(&self, phrase: &PhraseCandidate) -> f64 {
        self.phrase_score(&phrase.target)
    }

    fn score(&self, h: &Hypothesis) -> f64 {
        self.phrase_score(&h.phrase().target)
    }

    fn box_clone(&self) -> Box<dyn DecoderFeature> {
        Box::new(self.clone())
    }
}
