//! Candidate gathering for one sentence: phrase-table lookups, pruning,
//! marked translations and the copy-through fallback.

use tracing::{debug, debug_span, trace};

use super::ModelGenerator;
use crate::candidates::{apply_phrase_table_pruning, CandidateOrigin, PhraseCandidate, PhraseCandidateIndex};
use crate::coverage::Range;
use crate::decoder::DecodeError;
use crate::features::DecoderFeature;
use crate::hypothesis::Context;
use crate::lm::LanguageModel;
use crate::logprob::{dot_product, log_add, log_prob, LOG_ALMOST_0};
use crate::sentence::SourceSentence;
use crate::settings::{LmHeuristic, PruningCriterion};
use crate::vocab::WordId;

/// Unweighted LM estimate for a target phrase scored without outside
/// context.
pub(super) fn lm_heuristic(lm: &dyn LanguageModel, heuristic: LmHeuristic, target: &[WordId]) -> f64 {
    let full = lm.order().saturating_sub(1);
    match heuristic {
        LmHeuristic::None => 0.0,
        LmHeuristic::Unigram => target.iter().map(|&w| lm.word_prob(w, &[])).sum(),
        LmHeuristic::Incremental | LmHeuristic::Simple => {
            let mut sum = 0.0;
            for (i, &w) in target.iter().enumerate() {
                if heuristic == LmHeuristic::Simple && i < full {
                    continue;
                }
                let ctx: Context = target[i.saturating_sub(full)..i].iter().rev().copied().collect();
                sum += lm.word_prob(w, &ctx);
            }
            sum
        }
    }
}

/// Weighted phrase-local score: translation scores, LM heuristic and every
/// feature's precomputed part.
pub(super) fn phrase_score(
    gen: &ModelGenerator,
    features: &[(Box<dyn DecoderFeature>, f64)],
    c: &PhraseCandidate,
    heuristic: LmHeuristic,
    use_forward: bool,
) -> f64 {
    let w = &gen.config().weights;
    let mut score = log_add(
        dot_product(&w.backward, &c.backward),
        dot_product(&w.adir, &c.adir),
    );
    if use_forward {
        score = log_add(score, dot_product(&w.forward, &c.forward));
    }
    for (lm, &weight) in gen.language_models().iter().zip(&w.lm) {
        let v = lm_heuristic(lm.as_ref(), heuristic, &c.target);
        score = log_add(score, dot_product(&[weight], &[v]));
    }
    for (f, weight) in features {
        score = log_add(score, dot_product(&[*weight], &[f.precompute_future_score(c)]));
    }
    score
}

fn pruning_score(gen: &ModelGenerator, criterion: PruningCriterion, c: &PhraseCandidate) -> f64 {
    let w = &gen.config().weights;
    let backward = || dot_product(&w.backward, &c.backward);
    let forward = || dot_product(&w.forward, &c.forward);
    match criterion {
        PruningCriterion::Full => c.partial_score,
        PruningCriterion::BackwardWeights => backward(),
        PruningCriterion::ForwardWeights if c.forward.is_empty() || w.forward.is_empty() => backward(),
        PruningCriterion::ForwardWeights => forward(),
        PruningCriterion::Combined => log_add(backward(), forward()),
    }
}

pub(super) fn build_index(
    gen: &ModelGenerator,
    source: &SourceSentence,
    features: &[(Box<dyn DecoderFeature>, f64)],
) -> Result<PhraseCandidateIndex, DecodeError> {
    let n = source.len();
    let _span = debug_span!("build_candidates", n).entered();
    let cfg = &gen.config().phrase_table;
    let lm_cfg = &gen.config().lm;
    let tm = gen.translation_model();
    let vocab = gen.vocab();

    let marked = |span: Range| source.marks.iter().any(|m| m.span.overlaps(span));

    let finish = |mut c: PhraseCandidate| {
        c.partial_score = phrase_score(gen, features, &c, lm_cfg.future_heuristic, cfg.future_use_forward);
        c
    };

    let mut spans: Vec<Vec<Vec<PhraseCandidate>>> = (0..n).map(|i| vec![Vec::new(); n - i]).collect();
    let max_len = tm.max_phrase_len();
    for i in 0..n {
        for len in 1..=max_len.min(n - i) {
            let span = Range::new(i, i + len);
            if !cfg.bypass_marked && marked(span) {
                continue;
            }
            let list = &mut spans[i][len - 1];
            for e in tm.lookup(&source.tokens[i..i + len]) {
                list.push(finish(PhraseCandidate {
                    span,
                    target: e.target.clone(),
                    backward: e.backward.clone(),
                    forward: e.forward.clone(),
                    adir: e.adir.clone(),
                    partial_score: 0.0,
                    origin: CandidateOrigin::PhraseTable,
                }));
            }
            let before = list.len();
            apply_phrase_table_pruning(list, cfg.size_limit, log_prob(cfg.threshold), |c| {
                pruning_score(gen, cfg.pruning, c)
            });
            if before > list.len() {
                trace!(%span, before, after = list.len(), "pruned phrase table candidates");
            }
        }
    }

    let slots = |v: f64| (vec![v; tm.num_backward()], vec![v; tm.num_forward()], vec![v; tm.num_adir()]);
    let log_weight_marked = log_prob(cfg.weight_marked);
    for m in &source.marks {
        let (backward, forward, adir) = slots(log_add(m.log_prob, log_weight_marked));
        for target in &m.targets {
            spans[m.span.start][m.span.len() - 1].push(finish(PhraseCandidate {
                span: m.span,
                target: vocab.add_all(target),
                backward: backward.clone(),
                forward: forward.clone(),
                adir: adir.clone(),
                partial_score: 0.0,
                origin: CandidateOrigin::Marked,
            }));
        }
    }

    let mut oovs = vec![false; n];
    let (backward, forward, adir) = slots(LOG_ALMOST_0);
    for i in 0..n {
        let span = Range::new(i, i + 1);
        if !spans[i][0].is_empty() || marked(span) {
            continue;
        }
        oovs[i] = true;
        spans[i][0].push(finish(PhraseCandidate {
            span,
            target: vec![vocab.add(&source.tokens[i])],
            backward: backward.clone(),
            forward: forward.clone(),
            adir: adir.clone(),
            partial_score: 0.0,
            origin: CandidateOrigin::CopyThrough,
        }));
    }

    let index = PhraseCandidateIndex::new(spans, oovs);
    index
        .check_coverable()
        .map_err(|position| DecodeError::NoCandidates { position })?;
    debug!(
        candidates = index.num_candidates(),
        oovs = index.oovs().iter().filter(|&&o| o).count(),
        future = index.future_score_for(Range::new(0, n)),
        "candidate index built"
    );
    Ok(index)
}
