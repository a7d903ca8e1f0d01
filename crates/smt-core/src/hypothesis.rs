//! Partial translations and their ranking.
//!
//! Hypotheses form a DAG through `back` pointers and are shared with `Rc`:
//! several extensions of the same hypothesis keep it alive, and the winner
//! of a recombination keeps the loser alive through `recombined`. Every
//! hypothesis of a sentence is dropped when its decode finishes.

use std::cell::{Ref, RefCell};
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::candidates::PhraseCandidate;
use crate::coverage::UncoveredSet;
use crate::decoder::shift_reduce::ShiftReducer;
use crate::vocab::{Vocabulary, WordId};

/// Target words, most recent first.
pub type Context = SmallVec<[WordId; 8]>;

pub struct Hypothesis {
    id: u32,
    back: Option<Rc<Hypothesis>>,
    phrase: Rc<PhraseCandidate>,
    uncovered: UncoveredSet,
    num_covered: usize,
    source_len: usize,
    score: f64,
    future_score: f64,
    lm_context_size: Option<usize>,
    shift_reduce: Option<ShiftReducer>,
    recombined: RefCell<Vec<Rc<Hypothesis>>>,
}

impl Hypothesis {
    /// The empty hypothesis every search starts from: nothing covered,
    /// score 0.
    pub fn initial(source_len: usize, itg: bool) -> Self {
        Self {
            id: 0,
            back: None,
            phrase: Rc::new(PhraseCandidate::root()),
            uncovered: UncoveredSet::full(source_len),
            num_covered: 0,
            source_len,
            score: 0.0,
            future_score: 0.0,
            lm_context_size: None,
            shift_reduce: itg.then(ShiftReducer::new),
            recombined: RefCell::new(Vec::new()),
        }
    }

    /// `back` extended with `phrase`. The score is still `back`'s until
    /// [`Hypothesis::set_scores`] is called.
    pub fn extend(back: &Rc<Hypothesis>, phrase: Rc<PhraseCandidate>, id: u32) -> Self {
        let span = phrase.span;
        Self {
            id,
            back: Some(Rc::clone(back)),
            uncovered: back.uncovered.cover(span),
            num_covered: back.num_covered + span.len(),
            source_len: back.source_len,
            score: back.score,
            future_score: 0.0,
            lm_context_size: None,
            shift_reduce: back.shift_reduce.as_ref().map(|sr| sr.shift(span)),
            recombined: RefCell::new(Vec::new()),
            phrase,
        }
    }

    pub(crate) fn set_scores(&mut self, score: f64, future_score: f64) {
        self.score = score;
        self.future_score = future_score;
    }

    pub(crate) fn set_lm_context_size(&mut self, size: Option<usize>) {
        self.lm_context_size = size;
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn back(&self) -> Option<&Rc<Hypothesis>> {
        self.back.as_ref()
    }

    /// The phrase applied last; the zero-width root phrase for the initial
    /// hypothesis.
    pub fn phrase(&self) -> &PhraseCandidate {
        &self.phrase
    }

    pub fn phrase_rc(&self) -> &Rc<PhraseCandidate> {
        &self.phrase
    }

    pub fn uncovered(&self) -> &UncoveredSet {
        &self.uncovered
    }

    pub fn num_covered(&self) -> usize {
        self.num_covered
    }

    pub fn source_len(&self) -> usize {
        self.source_len
    }

    /// Accumulated score from the initial hypothesis.
    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn future_score(&self) -> f64 {
        self.future_score
    }

    /// Score plus future estimate; what stacks rank by.
    pub fn total(&self) -> f64 {
        self.score + self.future_score
    }

    pub fn lm_context_size(&self) -> Option<usize> {
        self.lm_context_size
    }

    pub fn shift_reducer(&self) -> Option<&ShiftReducer> {
        self.shift_reduce.as_ref()
    }

    pub fn is_initial(&self) -> bool {
        self.back.is_none()
    }

    pub fn is_complete(&self) -> bool {
        self.uncovered.is_empty()
    }

    /// Hypotheses merged into this one, best first.
    pub fn recombined(&self) -> Ref<'_, Vec<Rc<Hypothesis>>> {
        self.recombined.borrow()
    }

    /// Takes `loser` and everything it had absorbed.
    pub(crate) fn absorb(&self, loser: Rc<Hypothesis>) {
        let inherited = std::mem::take(&mut *loser.recombined.borrow_mut());
        let mut list = self.recombined.borrow_mut();
        list.push(loser);
        list.extend(inherited);
        list.sort_by(|a, b| compare_rank(b, a));
    }

    pub(crate) fn retain_recombined<F: FnMut(&Rc<Hypothesis>) -> bool>(&self, keep: F) {
        self.recombined.borrow_mut().retain(keep);
    }

    /// Up to `max` target words preceding the next phrase, most recent
    /// first. When the translation is shorter, the list ends with `<s>`.
    pub fn context_words(&self, max: usize) -> Context {
        let mut out = Context::new();
        if max == 0 {
            return out;
        }
        let mut node = Some(self);
        while let Some(h) = node {
            for &w in h.phrase.target.iter().rev() {
                out.push(w);
                if out.len() == max {
                    return out;
                }
            }
            node = h.back.as_deref();
        }
        out.push(Vocabulary::BOS);
        out
    }

    /// Hypotheses from the first phrase to this one; the initial hypothesis
    /// is left out.
    pub fn chain(&self) -> Vec<&Hypothesis> {
        let mut out = Vec::with_capacity(self.num_covered);
        let mut node = Some(self);
        while let Some(h) = node {
            if h.is_initial() {
                break;
            }
            out.push(h);
            node = h.back.as_deref();
        }
        out.reverse();
        out
    }

    pub fn phrases(&self) -> Vec<&PhraseCandidate> {
        self.chain().into_iter().map(Hypothesis::phrase).collect()
    }

    pub fn target_words(&self) -> Vec<WordId> {
        self.phrases()
            .into_iter()
            .flat_map(|p| p.target.iter().copied())
            .collect()
    }
}

impl fmt::Debug for Hypothesis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hypothesis")
            .field("id", &self.id)
            .field("back", &self.back.as_ref().map(|b| b.id))
            .field("span", &self.phrase.span)
            .field("uncovered", &self.uncovered.to_string())
            .field("score", &self.score)
            .field("future", &self.future_score)
            .finish()
    }
}

/// Stack order: higher total first, then higher score, then the older
/// hypothesis. `Greater` means `a` ranks better.
pub fn compare_rank(a: &Hypothesis, b: &Hypothesis) -> Ordering {
    a.total()
        .total_cmp(&b.total())
        .then_with(|| a.score.total_cmp(&b.score))
        .then_with(|| b.id.cmp(&a.id))
}

/// Max-heap adapter ordered by [`compare_rank`].
#[derive(Debug, Clone)]
pub struct Ranked(pub Rc<Hypothesis>);

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        compare_rank(&self.0, &other.0) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_rank(&self.0, &other.0)
    }
}
