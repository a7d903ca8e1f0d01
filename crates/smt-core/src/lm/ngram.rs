use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::LanguageModel;
use crate::logprob::LOG_ALMOST_0;
use crate::vocab::WordId;

type Key = SmallVec<[WordId; 4]>;

#[derive(Debug, Clone, Copy)]
struct NgramEntry {
    log_prob: f64,
    backoff: f64,
}

/// In-memory back-off n-gram model.
///
/// N-grams are keyed oldest word first, the way ARPA files list them.
/// Probabilities and back-off weights are natural logs.
#[derive(Debug, Clone)]
pub struct NgramLm {
    order: usize,
    ngrams: FxHashMap<Key, NgramEntry>,
    unk_log_prob: f64,
}

impl NgramLm {
    pub fn new(order: usize) -> Self {
        Self {
            order: order.max(1),
            ngrams: FxHashMap::default(),
            unk_log_prob: LOG_ALMOST_0,
        }
    }

    /// Score given to words with no unigram entry.
    pub fn with_unknown_log_prob(mut self, log_prob: f64) -> Self {
        self.unk_log_prob = log_prob;
        self
    }

    /// Adds an n-gram, oldest word first. N-grams longer than the order are
    /// ignored.
    pub fn insert(&mut self, words: &[WordId], log_prob: f64, backoff: f64) {
        if words.is_empty() || words.len() > self.order {
            return;
        }
        self.ngrams
            .insert(Key::from_slice(words), NgramEntry { log_prob, backoff });
    }

    pub fn len(&self) -> usize {
        self.ngrams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ngrams.is_empty()
    }

    /// `context[..k]` reversed, followed by `word` when given.
    fn key(context: &[WordId], k: usize, word: Option<WordId>) -> Key {
        let mut key: Key = context[..k].iter().rev().copied().collect();
        key.extend(word);
        key
    }
}

impl LanguageModel for NgramLm {
    fn order(&self) -> usize {
        self.order
    }

    fn word_prob(&self, word: WordId, context: &[WordId]) -> f64 {
        let max_ctx = context.len().min(self.order - 1);
        let mut backoff = 0.0;
        for k in (0..=max_ctx).rev() {
            if let Some(e) = self.ngrams.get(&Self::key(context, k, Some(word))) {
                return backoff + e.log_prob;
            }
            if k > 0 {
                if let Some(h) = self.ngrams.get(&Self::key(context, k, None)) {
                    backoff += h.backoff;
                }
            }
        }
        backoff + self.unk_log_prob
    }

    fn min_context_size(&self, context: &[WordId]) -> usize {
        let max_ctx = context.len().min(self.order - 1);
        (1..=max_ctx)
            .rev()
            .find(|&k| self.ngrams.contains_key(&Self::key(context, k, None)))
            .unwrap_or(0)
    }
}
