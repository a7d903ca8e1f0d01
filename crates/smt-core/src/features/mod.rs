//! Pluggable log-linear decoder features.
//!
//! A feature scores the transition from `h.back()` to `h`, estimates what
//! is left to pay, and owns whatever part of the hypothesis state it needs
//! for recombination beyond coverage and LM context. Scores are unweighted;
//! the model applies the configured weight.

mod distortion;
mod lexical;
mod segment;
mod walls;

pub use distortion::{LeftDistance, PhraseDisplacement, WordDisplacement, ZeroInfo};
pub use lexical::{Length, SparseIndicator};
pub use segment::{Bernoulli, SegmentCount};
pub use walls::Walls;

use crate::candidates::PhraseCandidate;
use crate::hypothesis::Hypothesis;
use crate::sentence::SourceSentence;
use crate::settings::{FeatureKind, FeatureSpec, SettingsError};
use crate::vocab::Vocabulary;

pub trait DecoderFeature: Send + Sync {
    fn name(&self) -> &str;

    /// Resets per-sentence state. Called on a fresh clone for every sentence.
    fn new_source_sentence(&mut self, _sentence: &SourceSentence) {}

    /// Phrase-local part of the score, folded into the candidate's partial
    /// score and hence into the future-score table.
    fn precompute_future_score(&self, _phrase: &PhraseCandidate) -> f64 {
        0.0
    }

    /// Score of the last transition into `h`.
    fn score(&self, h: &Hypothesis) -> f64;

    /// Estimate of the score still to come from `h`; must be exactly 0 once
    /// `h` is complete.
    fn future_score(&self, _h: &Hypothesis) -> f64 {
        0.0
    }

    fn recomb_hash(&self, _h: &Hypothesis) -> u64 {
        0
    }

    fn is_recombinable(&self, _a: &Hypothesis, _b: &Hypothesis) -> bool {
        true
    }

    /// Filter features only reject: a negative `score` makes the transition
    /// infeasible, anything else contributes nothing.
    fn is_filter(&self) -> bool {
        false
    }

    fn box_clone(&self) -> Box<dyn DecoderFeature>;
}

impl Clone for Box<dyn DecoderFeature> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

impl std::fmt::Debug for dyn DecoderFeature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// End of the phrase applied before `h`'s last one; 0 at the sentence start.
pub(crate) fn previous_end(h: &Hypothesis) -> usize {
    h.back().map_or(0, |b| b.phrase().span.end)
}

/// Builds a feature from its config entry.
pub fn create_feature(
    spec: &FeatureSpec,
    vocab: &Vocabulary,
) -> Result<Box<dyn DecoderFeature>, SettingsError> {
    let arg = spec.arg.as_deref();
    let feature: Box<dyn DecoderFeature> = match spec.kind {
        FeatureKind::WordDisplacement => Box::new(WordDisplacement),
        FeatureKind::PhraseDisplacement => Box::new(PhraseDisplacement),
        FeatureKind::LeftDistance => Box::new(LeftDistance),
        FeatureKind::ZeroInfo => Box::new(ZeroInfo),
        FeatureKind::SegmentCount => Box::new(SegmentCount),
        FeatureKind::Bernoulli => Box::new(Bernoulli::from_arg(arg)?),
        FeatureKind::Length => Box::new(Length),
        FeatureKind::Walls => Box::new(Walls::default()),
        FeatureKind::Sparse => Box::new(SparseIndicator::from_arg(arg, vocab)?),
    };
    Ok(feature)
}

pub(crate) fn bad_arg(kind: &str, reason: impl Into<String>) -> SettingsError {
    SettingsError::InvalidValue {
        field: format!("features.{kind}.arg"),
        reason: reason.into(),
    }
}
