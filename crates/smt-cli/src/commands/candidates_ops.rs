use serde::Serialize;
use smt_core::candidates::CandidateOrigin;
use smt_core::coverage::Range;
use smt_core::{ScoreModel, SentenceModel};

use super::die;
use crate::loaders::{load_generator, ModelPaths};
use crate::markup::parse_line;

#[derive(Debug, Serialize)]
struct CandidateRow {
    span: Range,
    target: Vec<String>,
    partial_score: f64,
    origin: &'static str,
}

#[derive(Debug, Serialize)]
struct FutureRow {
    span: Range,
    score: f64,
}

#[derive(Debug, Serialize)]
struct CandidateReport {
    /// Tokens in decoding order (mirrored when decoding backwards).
    source: Vec<String>,
    backwards: bool,
    oovs: Vec<bool>,
    candidates: Vec<CandidateRow>,
    future: Vec<FutureRow>,
}

fn origin_label(origin: CandidateOrigin) -> &'static str {
    match origin {
        CandidateOrigin::PhraseTable => "table",
        CandidateOrigin::Marked => "marked",
        CandidateOrigin::CopyThrough => "copy",
        CandidateOrigin::Root => "root",
    }
}

fn build_report(model: &SentenceModel<'_>) -> CandidateReport {
    let index = model.candidates();
    let vocab = model.generator().vocab();
    let candidates = index
        .iter_spans()
        .flat_map(|(span, list)| {
            list.iter().map(move |c| CandidateRow {
                span,
                target: vocab.words(&c.target),
                partial_score: c.partial_score,
                origin: origin_label(c.origin),
            })
        })
        .collect();
    let n = index.source_len();
    let future = (1..=n)
        .flat_map(|len| (0..=n - len).map(move |start| Range::new(start, start + len)))
        .map(|span| FutureRow {
            span,
            score: index.future_score_for(span),
        })
        .collect();
    CandidateReport {
        source: model.source().tokens.clone(),
        backwards: model.generator().config().backwards,
        oovs: index.oovs().to_vec(),
        candidates,
        future,
    }
}

fn print_report(report: &CandidateReport) {
    println!("source: {}", report.source.join(" "));
    if report.backwards {
        println!("(decoding right to left; spans index the reversed sentence)");
    }
    for row in &report.candidates {
        println!(
            "{:<10} {:>10.4}  {:<6} {}",
            row.span.to_string(),
            row.partial_score,
            row.origin,
            row.target.join(" ")
        );
    }
    println!("future scores:");
    for row in &report.future {
        println!("{:<10} {:>10.4}", row.span.to_string(), row.score);
    }
}

/// Shows every candidate of one input line and the future-score table
/// derived from them.
pub fn candidates_cmd(paths: &ModelPaths, line: &str, json: bool) {
    let gen = die!(load_generator(paths), "Error loading models: {}");
    let sentence = die!(parse_line(line), "Error in markup: {}");
    let model = die!(gen.create_model(&sentence), "Error: {}");
    let report = build_report(&model);
    if json {
        println!("{}", die!(serde_json::to_string_pretty(&report), "Error: {}"));
    } else {
        print_report(&report);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use smt_core::logprob::LOG_ALMOST_0;
    use smt_core::model::{MemoryPhraseTable, TmEntry};
    use smt_core::{DecoderConfig, ModelGenerator, SourceSentence, Vocabulary};

    fn generator(backwards: bool) -> ModelGenerator {
        let vocab = Arc::new(Vocabulary::new());
        let mut table = MemoryPhraseTable::with_score_counts(1, 0, 0);
        let entry = TmEntry {
            target: vec![vocab.add("le")],
            backward: vec![-0.5],
            forward: Vec::new(),
            adir: Vec::new(),
        };
        table.insert(&["the"], entry).unwrap();
        let mut config = DecoderConfig::default();
        config.weights.lm.clear();
        config.backwards = backwards;
        ModelGenerator::new(config, vocab, Arc::new(table), Vec::new()).unwrap()
    }

    #[test]
    fn report_lists_candidates_and_every_span() {
        let gen = generator(false);
        let model = gen.create_model(&SourceSentence::from_text("the dog")).unwrap();
        let report = build_report(&model);
        assert_eq!(report.oovs, vec![false, true]);
        assert_eq!(report.candidates.len(), 2);
        assert_eq!(report.candidates[0].target, vec!["le"]);
        assert_eq!(report.candidates[0].origin, "table");
        assert_eq!(report.candidates[1].span, Range::new(1, 2));
        assert_eq!(report.candidates[1].origin, "copy");
        // three spans for two words; the whole sentence splits in two
        assert_eq!(report.future.len(), 3);
        let whole = &report.future[2];
        assert_eq!(whole.span, Range::new(0, 2));
        assert!((whole.score - (-0.5 + LOG_ALMOST_0)).abs() < 1e-9);
    }

    #[test]
    fn backwards_report_is_mirrored() {
        let gen = generator(true);
        let model = gen.create_model(&SourceSentence::from_text("the dog")).unwrap();
        let report = build_report(&model);
        assert!(report.backwards);
        assert_eq!(report.source, vec!["dog", "the"]);
        assert_eq!(report.oovs, vec![true, false]);
    }
}
