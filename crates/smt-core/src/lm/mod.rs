//! Language-model lookup interface.
//!
//! Contexts are passed most-recent-word first: `context[0]` is the word
//! immediately before the predicted one.

mod ngram;

pub use ngram::NgramLm;

use crate::vocab::WordId;

/// A read-only n-gram language model, shared across decoding threads.
pub trait LanguageModel: Send + Sync {
    /// Highest n-gram order the model stores.
    fn order(&self) -> usize;

    /// Natural-log probability of `word` given `context` (most recent first).
    /// Only the first `order() - 1` context words are consulted.
    fn word_prob(&self, word: WordId, context: &[WordId]) -> f64;

    /// Length of the longest prefix of `context` that can still influence a
    /// future query. Dropping the remaining words never changes a score.
    fn min_context_size(&self, context: &[WordId]) -> usize;

    /// Per-sentence hook, e.g. for models filtered per input.
    fn new_source_sentence(&self, _tokens: &[String]) {}
}
