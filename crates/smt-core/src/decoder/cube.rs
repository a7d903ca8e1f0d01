//! Cube pruning (Huang & Chiang 2007).
//!
//! For each target stage, every group of earlier hypotheses that share
//! their reordering state forms, with each span it may translate into that
//! stage, a hyperedge: a grid of (state, phrase) pairs with states sorted by
//! score and phrases by their cube score. A heap seeded with each grid's
//! corner yields items best total first; popping an item evaluates its two
//! successors. At most `stack_size` items are popped per stage, counting
//! infeasible and recombined ones.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, debug_span, trace};

use super::finder::PhraseFinder;
use super::shift_reduce::ShiftReducer;
use super::{first_dead_stage, DecodeError, DecodeOutput, Expander};
use crate::candidates::PhraseCandidate;
use crate::coverage::{Range, UncoveredSet};
use crate::hypothesis::Hypothesis;
use crate::logprob::LOG_ZERO;
use crate::model::ScoreModel;
use crate::settings::DecoderConfig;
use crate::stack::{CubeStack, HypothesisStack, StackStats};

/// Hypotheses that the phrase finder cannot tell apart.
struct StateGroup {
    states: Vec<Rc<Hypothesis>>,
    spans: Vec<Range>,
}

type GroupKey = (UncoveredSet, Range, Option<ShiftReducer>);

/// Groups a finished stage (best first) and finds each group's next spans.
fn group_states(hyps: &[Rc<Hypothesis>], finder: &PhraseFinder<'_>) -> Vec<StateGroup> {
    let mut groups: Vec<StateGroup> = Vec::new();
    let mut by_key: FxHashMap<GroupKey, usize> = FxHashMap::default();
    for h in hyps {
        let key = (
            h.uncovered().clone(),
            h.phrase().span,
            h.shift_reducer().cloned(),
        );
        let slot = *by_key.entry(key).or_insert_with(|| {
            groups.push(StateGroup {
                states: Vec::new(),
                spans: finder.spans(h),
            });
            groups.len() - 1
        });
        groups[slot].states.push(Rc::clone(h));
    }
    groups
}

struct Hyperedge<'g> {
    states: &'g [Rc<Hypothesis>],
    phrases: Rc<Vec<Rc<PhraseCandidate>>>,
}

struct CubeItem {
    total: f64,
    edge: usize,
    i: usize,
    j: usize,
    hyp: Option<Rc<Hypothesis>>,
}

impl PartialEq for CubeItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CubeItem {}

impl PartialOrd for CubeItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CubeItem {
    // best total first; among equals, the earliest grid cell
    fn cmp(&self, other: &Self) -> Ordering {
        self.total
            .total_cmp(&other.total)
            .then_with(|| (other.edge, other.i, other.j).cmp(&(self.edge, self.i, self.j)))
    }
}

fn evaluate(
    expander: &Expander<'_>,
    edges: &[Hyperedge<'_>],
    edge: usize,
    i: usize,
    j: usize,
) -> Result<CubeItem, DecodeError> {
    let e = &edges[edge];
    let hyp = expander.expand(&e.states[i], &e.phrases[j])?;
    Ok(CubeItem {
        total: hyp.as_ref().map_or(LOG_ZERO, |h| h.total()),
        edge,
        i,
        j,
        hyp,
    })
}

/// Phrases of `span` sorted by cube score, computed once per sentence.
fn sorted_phrases(
    model: &dyn ScoreModel,
    cache: &mut FxHashMap<Range, Rc<Vec<Rc<PhraseCandidate>>>>,
    span: Range,
) -> Rc<Vec<Rc<PhraseCandidate>>> {
    let entry = cache.entry(span).or_insert_with(|| {
        let mut scored: Vec<(f64, Rc<PhraseCandidate>)> = model
            .candidates()
            .candidates(span)
            .iter()
            .map(|p| (model.phrase_partial_score(p), Rc::clone(p)))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        Rc::new(scored.into_iter().map(|(_, p)| p).collect())
    });
    Rc::clone(entry)
}

pub(super) fn decode(model: &dyn ScoreModel, config: &DecoderConfig) -> Result<DecodeOutput, DecodeError> {
    let n = model.source_len();
    let _span = debug_span!("cube_decode", n).entered();
    let finder = PhraseFinder::new(model.candidates(), &config.distortion);
    let expander = Expander::new(model);
    let k_best = config.search.stack_size;

    let root = expander.root(config.distortion.itg)?;
    let mut stages: Vec<Vec<Rc<Hypothesis>>> = vec![vec![root]];
    let mut groups: Vec<Vec<StateGroup>> = vec![group_states(&stages[0], &finder)];
    let mut stats = vec![StackStats {
        pushed: 1,
        popped: 1,
        ..StackStats::default()
    }];
    let mut phrase_cache = FxHashMap::default();

    for s in 1..=n {
        let mut edges: Vec<Hyperedge<'_>> = Vec::new();
        for (k, stage_groups) in groups.iter().enumerate() {
            for g in stage_groups {
                for &span in g.spans.iter().filter(|span| span.len() == s - k) {
                    edges.push(Hyperedge {
                        states: &g.states,
                        phrases: sorted_phrases(model, &mut phrase_cache, span),
                    });
                }
            }
        }

        let mut stack = CubeStack::new(model, config.search.keep_recombined);
        let mut heap = BinaryHeap::new();
        let mut explored: FxHashSet<(usize, usize, usize)> = FxHashSet::default();
        for edge in 0..edges.len() {
            explored.insert((edge, 0, 0));
            heap.push(evaluate(&expander, &edges, edge, 0, 0)?);
        }
        let mut pops = 0;
        while pops < k_best {
            let Some(item) = heap.pop() else {
                break;
            };
            pops += 1;
            let (edge, i, j) = (item.edge, item.i, item.j);
            match item.hyp {
                Some(h) => stack.push(h),
                None => trace!(edge, i, j, "infeasible cube item"),
            }
            let e = &edges[edge];
            for (ni, nj) in [(i + 1, j), (i, j + 1)] {
                if ni < e.states.len() && nj < e.phrases.len() && explored.insert((edge, ni, nj)) {
                    heap.push(evaluate(&expander, &edges, edge, ni, nj)?);
                }
            }
        }

        let finished = stack.drain_ranked();
        debug!(
            stage = s,
            edges = edges.len(),
            pops,
            stats = ?stack.stats(),
            "cube stage done"
        );
        stats.push(*stack.stats());
        drop(edges);
        groups.push(group_states(&finished, &finder));
        stages.push(finished);
    }

    let mut final_stack = stages.pop().unwrap_or_default();
    let Some(best) = final_stack.first().cloned() else {
        let stage = first_dead_stage(stages.iter().map(|s| !s.is_empty()));
        return Err(DecodeError::EmptyStack { stage, source_len: n });
    };
    if !config.wants_full_final_stack() {
        final_stack.truncate(1);
    }
    Ok(DecodeOutput {
        best,
        final_stack,
        stats,
    })
}
