use std::collections::BinaryHeap;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::recomb::RecombStack;
use super::{HypothesisStack, StackStats};
use crate::coverage::UncoveredSet;
use crate::hypothesis::{Hypothesis, Ranked};
use crate::logprob::{log_prob, LOG_ZERO};
use crate::model::ScoreModel;
use crate::settings::SearchSettings;

/// Classic beam stack with histogram, relative-threshold and coverage
/// pruning.
///
/// Pushes are cut against the best total seen so far. Pops come out best
/// first; the size limit, the threshold against the stack's overall best,
/// and the per-coverage limits are applied as they come out.
pub struct HistogramStack<'m> {
    recomb: RecombStack<'m>,
    heap: BinaryHeap<Ranked>,
    heapified: bool,
    size: usize,
    log_threshold: f64,
    cov_limit: usize,
    log_cov_threshold: f64,
    diversity: usize,
    diversity_increment: usize,
    keep_recombined: bool,
    best_total: f64,
    per_coverage: FxHashMap<UncoveredSet, (usize, f64)>,
    stats: StackStats,
}

impl<'m> HistogramStack<'m> {
    pub fn new(model: &'m dyn ScoreModel, search: &SearchSettings, size: usize) -> Self {
        Self {
            recomb: RecombStack::new(model, search.keep_recombined),
            heap: BinaryHeap::new(),
            heapified: false,
            size,
            log_threshold: log_prob(search.prune_threshold),
            cov_limit: search.cov_limit,
            log_cov_threshold: log_prob(search.cov_threshold),
            diversity: search.diversity,
            diversity_increment: search.diversity_increment,
            keep_recombined: search.keep_recombined,
            best_total: LOG_ZERO,
            per_coverage: FxHashMap::default(),
            stats: StackStats::default(),
        }
    }

    fn below(&self, total: f64, reference: f64, log_ratio: f64) -> bool {
        total < reference + log_ratio
    }

    fn heapify(&mut self) {
        self.heap = self.recomb.take_entries().into_iter().map(Ranked).collect();
        self.heapified = true;
    }

    /// Whether the diversity floor lets one more hypothesis of a coverage
    /// with `kept` survivors in past the size limit.
    fn diversity_allows(&self, kept: usize) -> bool {
        self.diversity > 0
            && kept < self.diversity
            && (self.diversity_increment == 0
                || self.stats.popped < self.size + self.diversity_increment)
    }

    fn prune_rest(&mut self) {
        self.stats.pruned_at_pop += self.heap.len();
        self.heap.clear();
    }
}

impl HypothesisStack for HistogramStack<'_> {
    fn push(&mut self, h: Rc<Hypothesis>) {
        debug_assert!(!self.heapified, "push after pop");
        self.stats.pushed += 1;
        let total = h.total();
        if self.below(total, self.best_total, self.log_threshold) {
            self.stats.pruned_at_push += 1;
            return;
        }
        if total > self.best_total {
            self.best_total = total;
        }
        if self.recomb.insert(h) {
            self.stats.recombined += 1;
        }
    }

    fn pop(&mut self) -> Option<Rc<Hypothesis>> {
        if !self.heapified {
            self.heapify();
        }
        loop {
            let Ranked(h) = self.heap.pop()?;
            let total = h.total();
            if self.below(total, self.best_total, self.log_threshold) {
                self.stats.pruned_at_pop += 1;
                self.prune_rest();
                return None;
            }
            let (kept, cov_best) = self
                .per_coverage
                .get(h.uncovered())
                .copied()
                .unwrap_or((0, total));
            if (self.cov_limit > 0 && kept >= self.cov_limit)
                || self.below(total, cov_best, self.log_cov_threshold)
            {
                self.stats.cov_pruned += 1;
                continue;
            }
            if self.stats.popped >= self.size && !self.diversity_allows(kept) {
                self.stats.pruned_at_pop += 1;
                if self.diversity == 0 {
                    self.prune_rest();
                    return None;
                }
                continue;
            }
            self.per_coverage
                .insert(h.uncovered().clone(), (kept + 1, cov_best));
            self.stats.popped += 1;
            if self.keep_recombined {
                let floor = self.best_total + self.log_threshold;
                h.retain_recombined(|r| r.total() >= floor);
            }
            return Some(h);
        }
    }

    fn len(&self) -> usize {
        if self.heapified {
            self.heap.len()
        } else {
            self.recomb.len()
        }
    }

    fn stats(&self) -> &StackStats {
        &self.stats
    }
}
