//! Shared fixtures for unit and scenario tests.

use std::rc::Rc;
use std::sync::Arc;

use crate::candidates::{CandidateOrigin, PhraseCandidate};
use crate::coverage::Range;
use crate::hypothesis::Hypothesis;
use crate::lm::{LanguageModel, NgramLm};
use crate::model::{MemoryPhraseTable, ModelGenerator, TmEntry};
use crate::settings::DecoderConfig;
use crate::vocab::{Vocabulary, WordId};

/// A phrase-table candidate with no scores attached.
pub fn phrase(start: usize, end: usize, target: &[WordId]) -> Rc<PhraseCandidate> {
    Rc::new(PhraseCandidate {
        span: Range::new(start, end),
        target: target.to_vec(),
        backward: Vec::new(),
        forward: Vec::new(),
        adir: Vec::new(),
        partial_score: 0.0,
        origin: CandidateOrigin::PhraseTable,
    })
}

/// The root over `n` words followed by one unscored extension per phrase.
/// `path(..)[0]` is the root.
pub fn path(n: usize, phrases: &[Rc<PhraseCandidate>]) -> Vec<Rc<Hypothesis>> {
    let mut out = vec![Rc::new(Hypothesis::initial(n, false))];
    for (i, p) in phrases.iter().enumerate() {
        let back = &out[out.len() - 1];
        let h = Hypothesis::extend(back, Rc::clone(p), i as u32 + 1);
        out.push(Rc::new(h));
    }
    out
}

/// A bigram model that gives every word probability 1.
#[derive(Debug, Clone, Copy)]
pub struct ZeroLm;

impl LanguageModel for ZeroLm {
    fn order(&self) -> usize {
        2
    }

    fn word_prob(&self, _word: WordId, _context: &[WordId]) -> f64 {
        0.0
    }

    fn min_context_size(&self, _context: &[WordId]) -> usize {
        0
    }
}

/// Builds a `ModelGenerator` from string-level phrase-table and LM entries.
///
/// The phrase table carries one backward score per entry; without explicit
/// n-grams the generator gets a [`ZeroLm`].
pub struct GeneratorBuilder {
    pub vocab: Arc<Vocabulary>,
    pub config: DecoderConfig,
    table: MemoryPhraseTable,
    ngrams: Option<NgramLm>,
}

impl GeneratorBuilder {
    pub fn new() -> Self {
        Self {
            vocab: Arc::new(Vocabulary::new()),
            config: DecoderConfig::default(),
            table: MemoryPhraseTable::with_score_counts(1, 0, 0),
            ngrams: None,
        }
    }

    /// Adds `source ||| target` with backward log-prob `score`.
    pub fn phrase(mut self, source: &str, target: &str, score: f64) -> Self {
        let src: Vec<&str> = source.split_whitespace().collect();
        let tgt: Vec<&str> = target.split_whitespace().collect();
        let entry = TmEntry {
            target: self.vocab.add_all(&tgt),
            backward: vec![score],
            forward: Vec::new(),
            adir: Vec::new(),
        };
        self.table.insert(&src, entry).unwrap();
        self
    }

    /// Adds an n-gram (oldest word first, space separated) to a bigram
    /// model. Words with no unigram entry score -18.
    pub fn ngram(mut self, words: &str, log_prob: f64, backoff: f64) -> Self {
        let ids: Vec<WordId> = words.split_whitespace().map(|w| self.vocab.add(w)).collect();
        self.ngrams
            .get_or_insert_with(|| NgramLm::new(2))
            .insert(&ids, log_prob, backoff);
        self
    }

    pub fn configure(mut self, f: impl FnOnce(&mut DecoderConfig)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn id(&self, word: &str) -> WordId {
        self.vocab.add(word)
    }

    pub fn build(self) -> ModelGenerator {
        let lm: Arc<dyn LanguageModel> = match self.ngrams {
            Some(lm) => Arc::new(lm),
            None => Arc::new(ZeroLm),
        };
        ModelGenerator::new(self.config, self.vocab, Arc::new(self.table), vec![lm]).unwrap()
    }
}

/// "the cat" / "le chat" toy model: the best translation scores -0.2.
pub fn cat_generator() -> GeneratorBuilder {
    GeneratorBuilder::new()
        .phrase("the", "le", -0.1)
        .phrase("the", "la", -1.0)
        .phrase("cat", "chat", -0.1)
        .phrase("the cat", "le chat", -0.5)
}
