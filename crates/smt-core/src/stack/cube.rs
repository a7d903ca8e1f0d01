use std::collections::BinaryHeap;
use std::rc::Rc;

use super::recomb::RecombStack;
use super::{HypothesisStack, StackStats};
use crate::hypothesis::{Hypothesis, Ranked};
use crate::model::ScoreModel;

/// Destination stack of cube pruning. The cube bounds how many items reach
/// it, counting merged ones, so it only recombines.
pub struct CubeStack<'m> {
    recomb: RecombStack<'m>,
    heap: Option<BinaryHeap<Ranked>>,
    stats: StackStats,
}

impl<'m> CubeStack<'m> {
    pub fn new(model: &'m dyn ScoreModel, keep_recombined: bool) -> Self {
        Self {
            recomb: RecombStack::new(model, keep_recombined),
            heap: None,
            stats: StackStats::default(),
        }
    }

    /// Every representative, best first.
    pub fn drain_ranked(&mut self) -> Vec<Rc<Hypothesis>> {
        std::iter::from_fn(|| self.pop()).collect()
    }
}

impl HypothesisStack for CubeStack<'_> {
    fn push(&mut self, h: Rc<Hypothesis>) {
        debug_assert!(self.heap.is_none(), "push after pop");
        self.stats.pushed += 1;
        if self.recomb.insert(h) {
            self.stats.recombined += 1;
        }
    }

    fn pop(&mut self) -> Option<Rc<Hypothesis>> {
        let recomb = &mut self.recomb;
        let heap = self
            .heap
            .get_or_insert_with(|| recomb.take_entries().into_iter().map(Ranked).collect());
        let Ranked(h) = heap.pop()?;
        self.stats.popped += 1;
        Some(h)
    }

    fn len(&self) -> usize {
        self.heap.as_ref().map_or(self.recomb.len(), BinaryHeap::len)
    }

    fn stats(&self) -> &StackStats {
        &self.stats
    }
}
