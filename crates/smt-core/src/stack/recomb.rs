use std::cmp::Ordering;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::hypothesis::{compare_rank, Hypothesis};
use crate::model::ScoreModel;

/// Hypotheses of one stage, merged by the model's recombination key.
pub(crate) struct RecombStack<'m> {
    model: &'m dyn ScoreModel,
    keep_recombined: bool,
    entries: Vec<Rc<Hypothesis>>,
    buckets: FxHashMap<u64, SmallVec<[usize; 2]>>,
}

impl<'m> RecombStack<'m> {
    pub fn new(model: &'m dyn ScoreModel, keep_recombined: bool) -> Self {
        Self {
            model,
            keep_recombined,
            entries: Vec::new(),
            buckets: FxHashMap::default(),
        }
    }

    /// Adds `h`, or merges it with an equivalent entry. The better of the
    /// two stays the representative; the other is absorbed into it or
    /// dropped. Returns true on a merge.
    pub fn insert(&mut self, h: Rc<Hypothesis>) -> bool {
        let hash = self.model.recomb_hash(&h);
        let bucket = self.buckets.entry(hash).or_default();
        let found = bucket
            .iter()
            .copied()
            .find(|&i| self.model.is_recombinable(&self.entries[i], &h));
        let Some(i) = found else {
            bucket.push(self.entries.len());
            self.entries.push(h);
            return false;
        };
        if compare_rank(&h, &self.entries[i]) == Ordering::Greater {
            let loser = std::mem::replace(&mut self.entries[i], h);
            if self.keep_recombined {
                self.entries[i].absorb(loser);
            }
        } else if self.keep_recombined {
            self.entries[i].absorb(h);
        }
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn take_entries(&mut self) -> Vec<Rc<Hypothesis>> {
        self.buckets.clear();
        std::mem::take(&mut self.entries)
    }
}
