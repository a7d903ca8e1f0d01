//! Stack-decoding search driver.
//!
//! Stages are indexed by the number of covered source words. Stage 0 holds
//! the initial hypothesis; every hypothesis popped from stage `k` is
//! extended with each reachable phrase into stage `k + len`. The best
//! hypothesis of stage `n` is the translation.
//!
//! - `beam`: histogram/threshold stacks, expanded exhaustively
//! - `cube`: cube pruning, lazily expanding (state, phrase) grids

mod beam;
mod cube;
pub(crate) mod distortion;
pub(crate) mod finder;
pub mod shift_reduce;

use std::cell::Cell;
use std::rc::Rc;

use serde::Serialize;

use crate::candidates::PhraseCandidate;
use crate::coverage::Range;
use crate::hypothesis::Hypothesis;
use crate::logprob::{is_feasible, log_add};
use crate::model::{ModelGenerator, ScoreModel};
use crate::sentence::SourceSentence;
use crate::settings::DecoderConfig;
use crate::stack::StackStats;

/// Modeling inconsistencies that abort one sentence.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("no hypothesis reached stage {stage} of a {source_len}-word sentence")]
    EmptyStack { stage: usize, source_len: usize },
    #[error("feature {feature} has future score {value} on a complete translation")]
    NonzeroFinalFuture { feature: String, value: f64 },
    #[error("no chain of candidate phrases gets past source position {position}")]
    NoCandidates { position: usize },
    #[error("marked span [{start}, {end}) does not fit a {len}-word sentence")]
    MarkedSpan { start: usize, end: usize, len: usize },
}

/// Result of one search.
#[derive(Debug)]
pub struct DecodeOutput {
    pub best: Rc<Hypothesis>,
    /// Every retained hypothesis of the last stage, best first.
    pub final_stack: Vec<Rc<Hypothesis>>,
    /// Per-stage stack counters, stage 0 first.
    pub stats: Vec<StackStats>,
}

/// One phrase of a translation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhraseAlignment {
    pub source: Range,
    pub target: Vec<String>,
    pub oov: bool,
}

/// Owned, thread-safe summary of a decoded sentence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Translation {
    pub tokens: Vec<String>,
    pub score: f64,
    pub phrases: Vec<PhraseAlignment>,
    /// Source positions that had no translation and were copied through.
    pub oovs: Vec<bool>,
}

impl Translation {
    pub fn text(&self) -> String {
        self.tokens.join(" ")
    }
}

pub struct Decoder<'a> {
    model: &'a dyn ScoreModel,
    config: &'a DecoderConfig,
}

impl<'a> Decoder<'a> {
    pub fn new(model: &'a dyn ScoreModel, config: &'a DecoderConfig) -> Self {
        Self { model, config }
    }

    pub fn decode(&self) -> Result<DecodeOutput, DecodeError> {
        if self.config.search.cube_pruning {
            cube::decode(self.model, self.config)
        } else {
            beam::decode(self.model, self.config)
        }
    }
}

/// Builds the sentence model, decodes, and summarizes the best hypothesis.
pub fn translate(gen: &ModelGenerator, sentence: &SourceSentence) -> Result<Translation, DecodeError> {
    let model = gen.create_model(sentence)?;
    let output = Decoder::new(&model, gen.config()).decode()?;
    Ok(model.translation(&output.best))
}

/// Creates and scores hypotheses, numbering them in creation order.
pub(crate) struct Expander<'a> {
    model: &'a dyn ScoreModel,
    next_id: Cell<u32>,
}

impl<'a> Expander<'a> {
    pub fn new(model: &'a dyn ScoreModel) -> Self {
        Self {
            model,
            next_id: Cell::new(1),
        }
    }

    pub fn root(&self, itg: bool) -> Result<Rc<Hypothesis>, DecodeError> {
        let mut h = Hypothesis::initial(self.model.source_len(), itg);
        h.set_lm_context_size(self.model.lm_context_size(&h));
        let future = self.model.compute_future_score(&h)?;
        h.set_scores(0.0, future);
        Ok(Rc::new(h))
    }

    /// `back` extended with `phrase`, or `None` when the transition is
    /// infeasible.
    pub fn expand(
        &self,
        back: &Rc<Hypothesis>,
        phrase: &Rc<PhraseCandidate>,
    ) -> Result<Option<Rc<Hypothesis>>, DecodeError> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let mut h = Hypothesis::extend(back, Rc::clone(phrase), id);
        if !self.model.passes_filters(&h) {
            return Ok(None);
        }
        let score = log_add(back.score(), self.model.score_translation(&h));
        if !is_feasible(score) {
            return Ok(None);
        }
        h.set_lm_context_size(self.model.lm_context_size(&h));
        let future = self.model.compute_future_score(&h)?;
        h.set_scores(score, future);
        Ok(Some(Rc::new(h)))
    }
}

/// The stage right after the last non-empty one.
fn first_dead_stage(mut non_empty: impl DoubleEndedIterator<Item = bool> + ExactSizeIterator) -> usize {
    non_empty.rposition(|b| b).map_or(0, |k| k + 1)
}

#[cfg(test)]
mod tests;
