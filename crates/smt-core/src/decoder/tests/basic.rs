use super::*;
use crate::features::DecoderFeature;
use crate::logprob::LOG_ALMOST_0;
use crate::testutil::cat_generator;

fn monotone_cat() -> GeneratorBuilder {
    cat_generator().configure(|c| c.distortion.limit = 0)
}

#[test]
fn translate_word_for_word() {
    let t = translate_both(monotone_cat, "the cat");
    assert_eq!(t.tokens, vec!["le", "chat"]);
    assert!((t.score - (-0.2)).abs() < 1e-9);
    assert_eq!(t.text(), "le chat");
    assert_eq!(t.phrases.len(), 2);
    assert_eq!(t.phrases[1].source, Range::new(1, 2));
    assert_eq!(t.oovs, vec![false, false]);
}

#[test]
fn copy_through_unknown_word() {
    let t = translate_both(monotone_cat, "the xyzzy");
    assert_eq!(t.tokens, vec!["le", "xyzzy"]);
    assert!((t.score - (-0.1 + LOG_ALMOST_0)).abs() < 1e-9);
    assert_eq!(t.oovs, vec![false, true]);
    assert!(t.phrases[1].oov);
}

#[test]
fn empty_sentence() {
    let t = translate_both(monotone_cat, "");
    assert!(t.tokens.is_empty());
    assert_eq!(t.score, 0.0);
}

#[test]
fn repeated_decodes_agree() {
    let gen = cat_generator().build();
    let sentence = SourceSentence::from_text("the cat the cat");
    let first = translate(&gen, &sentence).unwrap();
    for _ in 0..3 {
        assert_eq!(translate(&gen, &sentence).unwrap(), first);
    }
}

#[test]
fn output_carries_stage_stats() {
    let gen = monotone_cat().build();
    let model = gen.create_model(&SourceSentence::from_text("the cat")).unwrap();
    let out = Decoder::new(&model, gen.config()).decode().unwrap();
    assert_eq!(out.stats.len(), 3);
    assert_eq!(out.stats[0].popped, 1);
    assert_eq!(out.stats[1].pushed, 2);
    // the final stack keeps only the best unless asked otherwise
    assert_eq!(out.final_stack.len(), 1);
    assert!(Rc::ptr_eq(&out.best, &out.final_stack[0]));
    assert!(out.best.is_complete());
}

fn recombining() -> GeneratorBuilder {
    GeneratorBuilder::new()
        .phrase("a", "x", -0.1)
        .phrase("b", "y", -0.1)
        .phrase("a b", "x y", -0.5)
        .configure(|c| c.distortion.limit = 0)
}

#[test]
fn recombined_losers_are_kept_on_request() {
    for cube in [false, true] {
        let gen = recombining()
            .configure(|c| {
                c.search.keep_recombined = true;
                c.search.cube_pruning = cube;
            })
            .build();
        let model = gen.create_model(&SourceSentence::from_text("a b")).unwrap();
        let out = Decoder::new(&model, gen.config()).decode().unwrap();
        assert!((out.best.score() - (-0.2)).abs() < 1e-9);
        assert_eq!(out.best.phrases().len(), 2);
        let losers = out.best.recombined();
        assert_eq!(losers.len(), 1, "cube = {cube}");
        assert!((losers[0].score() - (-0.5)).abs() < 1e-9);
        assert_eq!(losers[0].target_words(), out.best.target_words());
    }

    let gen = recombining().build();
    let model = gen.create_model(&SourceSentence::from_text("a b")).unwrap();
    let out = Decoder::new(&model, gen.config()).decode().unwrap();
    assert!(out.best.recombined().is_empty());
}

/// Rejects every phrase ending at the given position.
#[derive(Debug, Clone)]
struct RejectEnd(usize);

impl DecoderFeature for RejectEnd {
    fn name(&self) -> &str {
        "RejectEnd"
    }

    fn score(&self, h: &Hypothesis) -> f64 {
        if !h.is_initial() && h.phrase().span.end == self.0 {
            -1.0
        } else {
            0.0
        }
    }

    fn is_filter(&self) -> bool {
        true
    }

    fn box_clone(&self) -> Box<dyn DecoderFeature> {
        Box::new(self.clone())
    }
}

#[test]
fn filter_prunes_transitions() {
    for cube in [false, true] {
        let gen = cat_generator()
            .configure(|c| c.search.cube_pruning = cube)
            .build()
            .with_feature(Box::new(RejectEnd(1)), 1.0);
        let t = translate(&gen, &SourceSentence::from_text("the cat")).unwrap();
        assert_eq!(t.tokens, vec!["le", "chat"]);
        assert_eq!(t.phrases.len(), 1, "cube = {cube}");
        assert!((t.score - (-0.5)).abs() < 1e-9);
    }
}

#[test]
fn dead_end_reports_first_empty_stage() {
    for cube in [false, true] {
        let gen = cat_generator()
            .configure(|c| c.search.cube_pruning = cube)
            .build()
            .with_feature(Box::new(RejectEnd(2)), 1.0);
        let err = translate(&gen, &SourceSentence::from_text("the cat")).unwrap_err();
        assert_eq!(
            err,
            DecodeError::EmptyStack {
                stage: 2,
                source_len: 2
            },
            "cube = {cube}"
        );
    }
}

/// Claims a cost remains even when nothing is left to translate.
#[derive(Debug, Clone)]
struct Owes;

impl DecoderFeature for Owes {
    fn name(&self) -> &str {
        "Owes"
    }

    fn score(&self, _h: &Hypothesis) -> f64 {
        0.0
    }

    fn future_score(&self, _h: &Hypothesis) -> f64 {
        -1.0
    }

    fn box_clone(&self) -> Box<dyn DecoderFeature> {
        Box::new(self.clone())
    }
}

#[test]
fn nonzero_final_future_is_fatal() {
    for cube in [false, true] {
        let gen = monotone_cat()
            .configure(|c| c.search.cube_pruning = cube)
            .build()
            .with_feature(Box::new(Owes), 1.0);
        let err = translate(&gen, &SourceSentence::from_text("the cat")).unwrap_err();
        assert_eq!(
            err,
            DecodeError::NonzeroFinalFuture {
                feature: "Owes".to_string(),
                value: -1.0
            }
        );
    }
}
