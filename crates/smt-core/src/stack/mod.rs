//! Hypothesis stacks: bounded, recombining containers for one search stage.
//!
//! Both flavours accept every push of a stage first and only then start
//! popping; popping is where the histogram stack prunes.

mod cube;
mod histogram;
mod recomb;

pub use cube::CubeStack;
pub use histogram::HistogramStack;

use std::rc::Rc;

use crate::hypothesis::Hypothesis;

pub trait HypothesisStack {
    fn push(&mut self, h: Rc<Hypothesis>);

    /// The best remaining hypothesis, or `None` once the stack is exhausted
    /// or everything left is pruned.
    fn pop(&mut self) -> Option<Rc<Hypothesis>>;

    /// Number of distinct (non-recombined) hypotheses pushed so far.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn stats(&self) -> &StackStats;
}

/// Counters logged per stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StackStats {
    pub pushed: usize,
    pub pruned_at_push: usize,
    pub recombined: usize,
    pub popped: usize,
    pub cov_pruned: usize,
    pub pruned_at_pop: usize,
}
