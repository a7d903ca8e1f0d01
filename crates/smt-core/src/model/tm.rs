use rustc_hash::FxHashMap;

use super::ModelError;
use crate::vocab::WordId;

/// One phrase-table translation of a source phrase.
#[derive(Debug, Clone, PartialEq)]
pub struct TmEntry {
    pub target: Vec<WordId>,
    /// log p(source | target), one per sub-model.
    pub backward: Vec<f64>,
    /// log p(target | source), one per sub-model; may be empty.
    pub forward: Vec<f64>,
    /// Adirectional scores (e.g. lexical or count features); may be empty.
    pub adir: Vec<f64>,
}

/// Phrase lookup service consumed when a sentence's candidates are built.
pub trait TranslationModel: Send + Sync {
    fn num_backward(&self) -> usize;
    fn num_forward(&self) -> usize;
    fn num_adir(&self) -> usize;

    /// Longest source phrase the model can match.
    fn max_phrase_len(&self) -> usize;

    /// All translations of the exact source phrase.
    fn lookup(&self, source: &[String]) -> &[TmEntry];

    /// Per-sentence hook, e.g. for tables filtered per input.
    fn new_source_sentence(&self, _tokens: &[String]) {}
}

/// Phrase table held entirely in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryPhraseTable {
    entries: FxHashMap<Vec<String>, Vec<TmEntry>>,
    dims: Option<(usize, usize, usize)>,
    max_phrase_len: usize,
}

impl MemoryPhraseTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixes the score counts up front, so an empty table still reports
    /// them.
    pub fn with_score_counts(backward: usize, forward: usize, adir: usize) -> Self {
        Self {
            dims: Some((backward, forward, adir)),
            ..Self::default()
        }
    }

    /// Adds a translation. All entries must carry the same number of
    /// backward, forward and adirectional scores.
    pub fn insert<S: AsRef<str>>(&mut self, source: &[S], entry: TmEntry) -> Result<(), ModelError> {
        if source.is_empty() {
            return Err(ModelError::EmptySourcePhrase);
        }
        let dims = (entry.backward.len(), entry.forward.len(), entry.adir.len());
        match self.dims {
            None => self.dims = Some(dims),
            Some(expected) if expected != dims => {
                return Err(ModelError::ScoreCount {
                    expected: format!("{}/{}/{}", expected.0, expected.1, expected.2),
                    got: format!("{}/{}/{}", dims.0, dims.1, dims.2),
                })
            }
            Some(_) => {}
        }
        let key: Vec<String> = source.iter().map(|s| s.as_ref().to_string()).collect();
        self.max_phrase_len = self.max_phrase_len.max(key.len());
        self.entries.entry(key).or_default().push(entry);
        Ok(())
    }

    /// Number of distinct source phrases.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TranslationModel for MemoryPhraseTable {
    fn num_backward(&self) -> usize {
        self.dims.map_or(0, |d| d.0)
    }

    fn num_forward(&self) -> usize {
        self.dims.map_or(0, |d| d.1)
    }

    fn num_adir(&self) -> usize {
        self.dims.map_or(0, |d| d.2)
    }

    fn max_phrase_len(&self) -> usize {
        self.max_phrase_len
    }

    fn lookup(&self, source: &[String]) -> &[TmEntry] {
        self.entries.get(source).map_or(&[], Vec::as_slice)
    }
}
