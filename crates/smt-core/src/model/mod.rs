//! Log-linear scoring: the per-session `ModelGenerator` and the
//! per-sentence `SentenceModel` the search consumes through `ScoreModel`.

mod build;
mod recomb;
mod sentence_model;
pub mod tm;

pub use sentence_model::SentenceModel;
pub use tm::{MemoryPhraseTable, TmEntry, TranslationModel};

use std::sync::Arc;

use tracing::debug;

use crate::candidates::{PhraseCandidate, PhraseCandidateIndex};
use crate::decoder::DecodeError;
use crate::features::{create_feature, DecoderFeature};
use crate::hypothesis::Hypothesis;
use crate::lm::LanguageModel;
use crate::sentence::SourceSentence;
use crate::settings::{DecoderConfig, SettingsError};
use crate::vocab::Vocabulary;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("{component} weights: expected {expected}, got {got}")]
    WeightCount {
        component: String,
        expected: usize,
        got: usize,
    },
    #[error("language model weights given but no language model loaded")]
    NoLanguageModel,
    #[error("phrase table entry has {got} scores (backward/forward/adir), table has {expected}")]
    ScoreCount { expected: String, got: String },
    #[error("phrase table entry with an empty source phrase")]
    EmptySourcePhrase,
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// What the search needs from a sentence's model.
///
/// Scores are natural logs; `f64::NEG_INFINITY` marks an infeasible
/// transition.
pub trait ScoreModel {
    fn source_len(&self) -> usize;

    fn candidates(&self) -> &PhraseCandidateIndex;

    /// Incremental score of the transition from `h.back()` to `h`.
    fn score_translation(&self, h: &Hypothesis) -> f64;

    /// Future-table entries of the uncovered runs plus every feature's own
    /// estimate. Fails when a feature reports a nonzero estimate for a
    /// complete hypothesis.
    fn compute_future_score(&self, h: &Hypothesis) -> Result<f64, DecodeError>;

    /// The cheap feasibility check run before scoring. Agrees with the
    /// filter check inside `score_translation`.
    fn passes_filters(&self, h: &Hypothesis) -> bool;

    /// LM context `h` must keep, when context minimization is on.
    fn lm_context_size(&self, h: &Hypothesis) -> Option<usize>;

    fn recomb_hash(&self, h: &Hypothesis) -> u64;

    fn is_recombinable(&self, a: &Hypothesis, b: &Hypothesis) -> bool;

    /// Score used to order phrases inside a cube.
    fn phrase_partial_score(&self, phrase: &PhraseCandidate) -> f64;
}

/// Session-wide model state: weights, sub-models and feature prototypes.
/// Shared across threads; each sentence gets its own `SentenceModel`.
pub struct ModelGenerator {
    config: DecoderConfig,
    vocab: Arc<Vocabulary>,
    tm: Arc<dyn TranslationModel>,
    lms: Vec<Arc<dyn LanguageModel>>,
    features: Vec<(Box<dyn DecoderFeature>, f64)>,
    lm_numwords: usize,
}

impl ModelGenerator {
    /// Checks weight counts against the loaded models and instantiates the
    /// configured features.
    pub fn new(
        config: DecoderConfig,
        vocab: Arc<Vocabulary>,
        tm: Arc<dyn TranslationModel>,
        lms: Vec<Arc<dyn LanguageModel>>,
    ) -> Result<Self, ModelError> {
        config.validate()?;
        let w = &config.weights;
        let check = |component: &str, expected: usize, got: usize| {
            if expected == got {
                Ok(())
            } else {
                Err(ModelError::WeightCount {
                    component: component.to_string(),
                    expected,
                    got,
                })
            }
        };
        check("backward", tm.num_backward(), w.backward.len())?;
        if !w.forward.is_empty() {
            check("forward", tm.num_forward(), w.forward.len())?;
        }
        if !w.adir.is_empty() {
            check("adir", tm.num_adir(), w.adir.len())?;
        }
        if lms.is_empty() && !w.lm.is_empty() {
            return Err(ModelError::NoLanguageModel);
        }
        check("lm", lms.len(), w.lm.len())?;

        let features = config
            .features
            .iter()
            .map(|spec| Ok((create_feature(spec, &vocab)?, spec.weight)))
            .collect::<Result<Vec<_>, SettingsError>>()?;

        let max_order = lms.iter().map(|lm| lm.order()).max().unwrap_or(1);
        let lm_numwords = if config.lm.order > 0 {
            config.lm.order
        } else {
            max_order
        };
        debug!(
            lms = lms.len(),
            lm_numwords,
            features = features.len(),
            "model generator ready"
        );
        Ok(Self {
            config,
            vocab,
            tm,
            lms,
            features,
            lm_numwords,
        })
    }

    /// Registers an extra feature not expressible in the config.
    pub fn with_feature(mut self, feature: Box<dyn DecoderFeature>, weight: f64) -> Self {
        self.features.push((feature, weight));
        self
    }

    /// Builds the candidate index for `sentence` and the per-sentence
    /// feature instances. In backwards mode the sentence is mirrored first.
    pub fn create_model(&self, sentence: &SourceSentence) -> Result<SentenceModel<'_>, DecodeError> {
        SentenceModel::new(self, sentence)
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn vocab(&self) -> &Arc<Vocabulary> {
        &self.vocab
    }

    pub fn translation_model(&self) -> &dyn TranslationModel {
        self.tm.as_ref()
    }

    pub fn language_models(&self) -> &[Arc<dyn LanguageModel>] {
        &self.lms
    }

    pub(crate) fn features(&self) -> &[(Box<dyn DecoderFeature>, f64)] {
        &self.features
    }

    /// Highest n-gram order used for LM context.
    pub fn lm_numwords(&self) -> usize {
        self.lm_numwords
    }

    /// Weights in the order of `SentenceModel::feature_values`: backward,
    /// forward, adir, one per LM, then the decoder features.
    pub fn weight_vector(&self) -> Vec<f64> {
        let w = &self.config.weights;
        w.backward
            .iter()
            .chain(&w.forward)
            .chain(&w.adir)
            .chain(&w.lm)
            .copied()
            .chain(self.features.iter().map(|(_, weight)| *weight))
            .collect()
    }
}

impl std::fmt::Debug for ModelGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelGenerator")
            .field("lms", &self.lms.len())
            .field("features", &self.features.len())
            .field("lm_numwords", &self.lm_numwords)
            .finish()
    }
}
