use tracing::trace;

use super::{build, recomb, ModelGenerator, ScoreModel};
use crate::candidates::{PhraseCandidate, PhraseCandidateIndex};
use crate::decoder::{DecodeError, PhraseAlignment, Translation};
use crate::features::DecoderFeature;
use crate::hypothesis::Hypothesis;
use crate::lm::LanguageModel;
use crate::logprob::{dot_product, log_add, LOG_ZERO};
use crate::sentence::SourceSentence;
use crate::vocab::Vocabulary;

/// Model state for one sentence: its candidate index and feature instances.
///
/// Holds `Rc`s, so it stays on the thread that decodes the sentence.
pub struct SentenceModel<'g> {
    gen: &'g ModelGenerator,
    source: SourceSentence,
    index: PhraseCandidateIndex,
    features: Vec<(Box<dyn DecoderFeature>, f64)>,
}

impl<'g> SentenceModel<'g> {
    pub(super) fn new(gen: &'g ModelGenerator, sentence: &SourceSentence) -> Result<Self, DecodeError> {
        check_marks(sentence)?;
        let source = if gen.config().backwards {
            sentence.reversed()
        } else {
            sentence.clone()
        };
        gen.translation_model().new_source_sentence(&source.tokens);
        for lm in gen.language_models() {
            lm.new_source_sentence(&source.tokens);
        }
        let mut features = gen.features().to_vec();
        for (f, _) in &mut features {
            f.new_source_sentence(&source);
        }
        let index = build::build_index(gen, &source, &features)?;
        Ok(Self {
            gen,
            source,
            index,
            features,
        })
    }

    /// The sentence as decoded; mirrored in backwards mode.
    pub fn source(&self) -> &SourceSentence {
        &self.source
    }

    pub fn generator(&self) -> &ModelGenerator {
        self.gen
    }

    /// Unweighted LM score of the words `h` adds, with `</s>` once `h` is
    /// complete.
    fn lm_score(&self, lm: &dyn LanguageModel, h: &Hypothesis) -> f64 {
        let Some(back) = h.back() else {
            return 0.0;
        };
        // never more history than the recombination key keeps
        let keep = self.gen.lm_numwords().min(lm.order()).saturating_sub(1);
        let mut ctx = back.context_words(keep);
        let mut score = 0.0;
        for &w in &h.phrase().target {
            score += lm.word_prob(w, &ctx);
            if keep > 0 {
                ctx.insert(0, w);
                ctx.truncate(keep);
            }
        }
        if h.is_complete() {
            score += lm.word_prob(Vocabulary::EOS, &ctx);
        }
        score
    }

    /// Unweighted feature totals along `h`'s chain, in the order of
    /// [`ModelGenerator::weight_vector`]. Filter features report 0.
    pub fn feature_values(&self, h: &Hypothesis) -> Vec<f64> {
        let w = &self.gen.config().weights;
        let lms = self.gen.language_models();
        let dims = [w.backward.len(), w.forward.len(), w.adir.len(), lms.len()];
        let mut values = vec![0.0; dims.iter().sum::<usize>() + self.features.len()];
        for step in h.chain() {
            let p = step.phrase();
            let mut offset = 0;
            for (slot, len) in [&p.backward, &p.forward, &p.adir].into_iter().zip(dims) {
                for (i, v) in slot.iter().take(len).enumerate() {
                    values[offset + i] += v;
                }
                offset += len;
            }
            for (j, lm) in lms.iter().enumerate() {
                values[offset + j] += self.lm_score(lm.as_ref(), step);
            }
            offset += lms.len();
            for (j, (f, _)) in self.features.iter().enumerate() {
                if !f.is_filter() {
                    values[offset + j] += f.score(step);
                }
            }
        }
        values
    }

    /// Owned summary of a complete hypothesis, in source order even in
    /// backwards mode.
    pub fn translation(&self, h: &Hypothesis) -> Translation {
        let vocab = self.gen.vocab();
        let n = self.source.len();
        let mut phrases: Vec<PhraseAlignment> = h
            .phrases()
            .into_iter()
            .map(|p| PhraseAlignment {
                source: p.span,
                target: vocab.words(&p.target),
                oov: p.is_copy_through(),
            })
            .collect();
        let mut oovs = self.index.oovs().to_vec();
        if self.gen.config().backwards {
            phrases.reverse();
            for p in &mut phrases {
                p.source = p.source.mirror(n);
                p.target.reverse();
            }
            oovs.reverse();
        }
        Translation {
            tokens: phrases.iter().flat_map(|p| p.target.iter().cloned()).collect(),
            score: h.score(),
            phrases,
            oovs,
        }
    }
}

/// Marks must be checked before backwards mode mirrors them.
fn check_marks(sentence: &SourceSentence) -> Result<(), DecodeError> {
    let n = sentence.len();
    match sentence.marks.iter().find(|m| m.span.is_empty() || m.span.end > n) {
        Some(m) => Err(DecodeError::MarkedSpan {
            start: m.span.start,
            end: m.span.end,
            len: n,
        }),
        None => Ok(()),
    }
}

impl ScoreModel for SentenceModel<'_> {
    fn source_len(&self) -> usize {
        self.source.len()
    }

    fn candidates(&self) -> &PhraseCandidateIndex {
        &self.index
    }

    fn score_translation(&self, h: &Hypothesis) -> f64 {
        if !self.passes_filters(h) {
            return LOG_ZERO;
        }
        let w = &self.gen.config().weights;
        let p = h.phrase();
        let mut score = log_add(
            dot_product(&w.backward, &p.backward),
            log_add(dot_product(&w.forward, &p.forward), dot_product(&w.adir, &p.adir)),
        );
        for (lm, &weight) in self.gen.language_models().iter().zip(&w.lm) {
            score = log_add(score, dot_product(&[weight], &[self.lm_score(lm.as_ref(), h)]));
        }
        for (f, weight) in &self.features {
            if !f.is_filter() {
                score = log_add(score, dot_product(&[*weight], &[f.score(h)]));
            }
        }
        trace!(id = h.id(), span = %p.span, score, "scored transition");
        score
    }

    fn compute_future_score(&self, h: &Hypothesis) -> Result<f64, DecodeError> {
        let mut future = h
            .uncovered()
            .runs()
            .iter()
            .fold(0.0, |acc, &r| log_add(acc, self.index.future_score_for(r)));
        let complete = h.is_complete();
        for (f, weight) in &self.features {
            let v = f.future_score(h);
            if complete && v != 0.0 {
                return Err(DecodeError::NonzeroFinalFuture {
                    feature: f.name().to_string(),
                    value: v,
                });
            }
            future = log_add(future, dot_product(&[*weight], &[v]));
        }
        Ok(future)
    }

    fn passes_filters(&self, h: &Hypothesis) -> bool {
        self.features
            .iter()
            .filter(|(f, _)| f.is_filter())
            .all(|(f, _)| f.score(h) >= 0.0)
    }

    fn lm_context_size(&self, h: &Hypothesis) -> Option<usize> {
        if !self.gen.config().lm.minimize_context_size {
            return None;
        }
        let full = self.gen.lm_numwords().saturating_sub(1);
        if full == 0 {
            return Some(0);
        }
        let ctx = h.context_words(full);
        let needed = self
            .gen
            .language_models()
            .iter()
            .map(|lm| lm.min_context_size(&ctx))
            .max()
            .unwrap_or(0);
        Some(needed.clamp(1, full))
    }

    fn recomb_hash(&self, h: &Hypothesis) -> u64 {
        let len = recomb::context_len(h, self.gen.lm_numwords(), self.gen.config().lm.max_context_size);
        let ctx = h.context_words(len);
        let base = recomb::base_hash(h, &ctx, len);
        self.features
            .iter()
            .fold(base, |acc, (f, _)| recomb::fold_feature(acc, f.recomb_hash(h)))
    }

    fn is_recombinable(&self, a: &Hypothesis, b: &Hypothesis) -> bool {
        recomb::base_equal(a, b, self.gen.lm_numwords(), self.gen.config().lm.max_context_size)
            && self.features.iter().all(|(f, _)| f.is_recombinable(a, b))
    }

    fn phrase_partial_score(&self, phrase: &PhraseCandidate) -> f64 {
        build::phrase_score(
            self.gen,
            &self.features,
            phrase,
            self.gen.config().lm.cube_heuristic,
            true,
        )
    }
}
