use tracing::{debug, debug_span};

use super::finder::PhraseFinder;
use super::{first_dead_stage, DecodeError, DecodeOutput, Expander};
use crate::model::ScoreModel;
use crate::settings::DecoderConfig;
use crate::stack::{HistogramStack, HypothesisStack};

pub(super) fn decode(model: &dyn ScoreModel, config: &DecoderConfig) -> Result<DecodeOutput, DecodeError> {
    let n = model.source_len();
    let _span = debug_span!("decode", n).entered();
    let index = model.candidates();
    let finder = PhraseFinder::new(index, &config.distortion);
    let expander = Expander::new(model);

    let mut stacks: Vec<HistogramStack<'_>> = (0..=n)
        .map(|k| {
            let size = if k == n {
                config.final_stack_size()
            } else {
                config.histogram_stack_size()
            };
            HistogramStack::new(model, &config.search, size)
        })
        .collect();
    stacks[0].push(expander.root(config.distortion.itg)?);

    for k in 0..n {
        let mut expanded = 0usize;
        while let Some(h) = stacks[k].pop() {
            for span in finder.spans(&h) {
                for phrase in index.candidates(span) {
                    if let Some(next) = expander.expand(&h, phrase)? {
                        stacks[k + span.len()].push(next);
                        expanded += 1;
                    }
                }
            }
        }
        debug!(stage = k, stats = ?stacks[k].stats(), expanded, "stage done");
        if stacks[k + 1..].iter().all(|s| s.is_empty()) {
            let stage = first_dead_stage(stacks.iter().map(|s| s.stats().popped > 0));
            return Err(DecodeError::EmptyStack { stage, source_len: n });
        }
    }

    let final_stack: Vec<_> = std::iter::from_fn(|| stacks[n].pop()).collect();
    debug!(stage = n, stats = ?stacks[n].stats(), "final stage done");
    let best = final_stack
        .first()
        .cloned()
        .ok_or(DecodeError::EmptyStack { stage: n, source_len: n })?;
    Ok(DecodeOutput {
        best,
        final_stack,
        stats: stacks.iter().map(|s| *s.stats()).collect(),
    })
}
