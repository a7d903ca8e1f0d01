//! Target-side vocabulary shared by the phrase table, the language models and
//! the decoder features.
//!
//! One `Vocabulary` is created per session and passed around as
//! `Arc<Vocabulary>`. Interning is guarded by an `RwLock` so copy-through
//! words can be added while other sentences decode on other threads.

use std::sync::{PoisonError, RwLock};

use rustc_hash::FxHashMap;

pub type WordId = u32;

/// Sentence-start marker used as LM context.
pub const SENT_START: &str = "<s>";
/// Sentence-end marker scored when a translation completes.
pub const SENT_END: &str = "</s>";

#[derive(Default)]
struct VocabInner {
    str_to_id: FxHashMap<String, WordId>,
    id_to_str: Vec<String>,
}

pub struct Vocabulary {
    inner: RwLock<VocabInner>,
}

impl Vocabulary {
    /// Id of `<s>`; always 0.
    pub const BOS: WordId = 0;
    /// Id of `</s>`; always 1.
    pub const EOS: WordId = 1;

    pub fn new() -> Self {
        let vocab = Self {
            inner: RwLock::new(VocabInner::default()),
        };
        vocab.add(SENT_START);
        vocab.add(SENT_END);
        vocab
    }

    /// Interns `word`, returning its existing id if already known.
    pub fn add(&self, word: &str) -> WordId {
        if let Some(id) = self.index(word) {
            return id;
        }
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        // another writer may have won the race between the two locks
        if let Some(&id) = inner.str_to_id.get(word) {
            return id;
        }
        let id = inner.id_to_str.len() as WordId;
        inner.str_to_id.insert(word.to_string(), id);
        inner.id_to_str.push(word.to_string());
        id
    }

    pub fn add_all<S: AsRef<str>>(&self, words: &[S]) -> Vec<WordId> {
        words.iter().map(|w| self.add(w.as_ref())).collect()
    }

    pub fn index(&self, word: &str) -> Option<WordId> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.str_to_id.get(word).copied()
    }

    pub fn word(&self, id: WordId) -> Option<String> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.id_to_str.get(id as usize).cloned()
    }

    /// Renders ids as strings. Unknown ids render as `<unk>`.
    pub fn words(&self, ids: &[WordId]) -> Vec<String> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        ids.iter()
            .map(|&id| {
                inner
                    .id_to_str
                    .get(id as usize)
                    .cloned()
                    .unwrap_or_else(|| "<unk>".to_string())
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .id_to_str
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Vocabulary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vocabulary").field("len", &self.len()).finish()
    }
}
