use super::*;
use crate::logprob::LOG_ZERO;
use crate::sentence::MarkedTranslation;
use crate::settings::{FeatureKind, FeatureSpec};

#[test]
fn lm_reorders_without_a_limit() {
    let t = translate_both(swap_generator, "a b");
    assert_eq!(t.tokens, vec!["y", "x"]);
    // tm -0.2, lm: <s> y, y x, x </s>
    assert!((t.score - (-0.5)).abs() < 1e-9);
    assert_eq!(t.phrases[0].source, Range::new(1, 2));
}

#[test]
fn zero_limit_is_monotone() {
    let t = translate_both(|| swap_generator().configure(|c| c.distortion.limit = 0), "a b");
    assert_eq!(t.tokens, vec!["x", "y"]);
    // tm -0.2, lm: three unigrams at -2
    assert!((t.score - (-6.2)).abs() < 1e-9);
}

/// `a b c` word for word; the model cannot start with `x`, so only
/// reordered translations are feasible.
fn no_monotone_start() -> GeneratorBuilder {
    GeneratorBuilder::new()
        .phrase("a", "x", -0.1)
        .phrase("b", "y", -0.1)
        .phrase("c", "z", -0.1)
        .ngram("x", -1.0, 0.0)
        .ngram("y", -1.0, 0.0)
        .ngram("z", -1.0, 0.0)
        .ngram("</s>", -1.0, 0.0)
        .ngram("<s> x", LOG_ZERO, 0.0)
        .ngram("<s> z", -0.5, 0.0)
        .ngram("z y", -0.5, 0.0)
}

#[test]
fn zero_limit_leaves_reordered_candidates_unreachable() {
    let sentence = SourceSentence::from_text("a b c");
    for cube in [false, true] {
        let gen = no_monotone_start()
            .configure(|c| {
                c.distortion.limit = 0;
                c.search.cube_pruning = cube;
            })
            .build();
        assert_eq!(
            translate(&gen, &sentence).err(),
            Some(DecodeError::EmptyStack {
                stage: 1,
                source_len: 3
            }),
            "cube = {cube}"
        );
    }
}

#[test]
fn unlimited_distortion_decodes_reordered_candidates() {
    let t = translate_both(no_monotone_start, "a b c");
    assert_eq!(t.tokens, vec!["z", "y", "x"]);
    // tm -0.3, lm: <s> z, z y, then x and </s> as unigrams
    assert!((t.score - (-3.3)).abs() < 1e-9);
    let sources: Vec<Range> = t.phrases.iter().map(|p| p.source).collect();
    assert_eq!(sources, vec![Range::new(2, 3), Range::new(1, 2), Range::new(0, 1)]);
}

#[test]
fn zero_limit_only_expands_in_source_order() {
    // without the dead start the model still wants z y x
    let builder = || {
        GeneratorBuilder::new()
            .phrase("a", "x", -0.1)
            .phrase("b", "y", -0.1)
            .phrase("c", "z", -0.1)
            .ngram("x", -1.0, 0.0)
            .ngram("y", -1.0, 0.0)
            .ngram("z", -1.0, 0.0)
            .ngram("</s>", -1.0, 0.0)
            .ngram("<s> z", -0.1, 0.0)
            .ngram("z y", -0.1, 0.0)
            .ngram("y x", -0.1, 0.0)
            .configure(|c| {
                c.distortion.limit = 0;
                c.search.keep_recombined = true;
            })
    };
    let t = translate_both(builder, "a b c");
    assert_eq!(t.tokens, vec!["x", "y", "z"]);

    let gen = builder().build();
    let model = gen.create_model(&SourceSentence::from_text("a b c")).unwrap();
    let out = Decoder::new(&model, gen.config()).decode().unwrap();
    for h in &out.final_stack {
        for reached in std::iter::once(h).chain(h.recombined().iter()) {
            let starts: Vec<usize> = reached.phrases().iter().map(|p| p.span.start).collect();
            assert!(starts.windows(2).all(|w| w[0] < w[1]), "{starts:?}");
        }
    }
}

#[test]
fn phrase_swap_relaxes_a_zero_limit() {
    let t = translate_both(
        || {
            swap_generator().configure(|c| {
                c.distortion.limit = 0;
                c.distortion.phrase_swap = true;
            })
        },
        "a b",
    );
    assert_eq!(t.tokens, vec!["y", "x"]);
}

#[test]
fn walls_block_the_swap() {
    let sentence = SourceSentence::from_text("a b").with_wall(1);
    for cube in [false, true] {
        let gen = swap_generator()
            .configure(|c| {
                c.search.cube_pruning = cube;
                c.features.push(FeatureSpec {
                    kind: FeatureKind::Walls,
                    weight: 1.0,
                    arg: None,
                });
            })
            .build();
        let t = translate(&gen, &sentence).unwrap();
        assert_eq!(t.tokens, vec!["x", "y"], "cube = {cube}");
        // without the wall the swap wins again
        let t = translate(&gen, &SourceSentence::from_text("a b")).unwrap();
        assert_eq!(t.tokens, vec!["y", "x"]);
    }
}

/// `a b c d` word for word, with a bigram model that wants the source
/// order 2 4 1 3, which no binary bracketing produces.
fn inside_out() -> GeneratorBuilder {
    GeneratorBuilder::new()
        .phrase("a", "p", -0.1)
        .phrase("b", "q", -0.1)
        .phrase("c", "r", -0.1)
        .phrase("d", "s", -0.1)
        .ngram("p", -3.0, 0.0)
        .ngram("q", -3.0, 0.0)
        .ngram("r", -3.0, 0.0)
        .ngram("s", -3.0, 0.0)
        .ngram("</s>", -3.0, 0.0)
        .ngram("<s> q", -0.1, 0.0)
        .ngram("q s", -0.1, 0.0)
        .ngram("s p", -0.1, 0.0)
        .ngram("p r", -0.1, 0.0)
        .ngram("r </s>", -0.1, 0.0)
}

#[test]
fn itg_forbids_inside_out_permutation() {
    let free = translate_both(inside_out, "a b c d");
    assert_eq!(free.tokens, vec!["q", "s", "p", "r"]);
    assert!((free.score - (-0.9)).abs() < 1e-9);

    let itg = translate_both(|| inside_out().configure(|c| c.distortion.itg = true), "a b c d");
    assert_ne!(itg.tokens, free.tokens);
    assert!(itg.score < free.score);
    let mut sorted = itg.tokens.clone();
    sorted.sort();
    assert_eq!(sorted, vec!["p", "q", "r", "s"]);
}

#[test]
fn minimized_context_changes_nothing() {
    let full = translate_both(inside_out, "a b c d");
    let minimized = translate_both(
        || inside_out().configure(|c| c.lm.minimize_context_size = true),
        "a b c d",
    );
    assert_eq!(full, minimized);
}

#[test]
fn backwards_output_reads_forwards() {
    // the table is keyed on reversed text: source "b" is the first word
    // decoded
    let sentence = SourceSentence::from_text("a b").with_mark(MarkedTranslation {
        span: Range::new(0, 1),
        targets: vec![vec!["p".to_string(), "q".to_string()]],
        log_prob: -0.5,
    });
    for cube in [false, true] {
        let gen = GeneratorBuilder::new()
            .phrase("b", "y", -0.1)
            .configure(|c| {
                c.backwards = true;
                c.distortion.limit = 0;
                c.search.cube_pruning = cube;
            })
            .build();
        let t = translate(&gen, &sentence).unwrap();
        assert_eq!(t.tokens, vec!["p", "q", "y"], "cube = {cube}");
        assert!((t.score - (-0.6)).abs() < 1e-9);
        assert_eq!(t.phrases[0].source, Range::new(0, 1));
        assert_eq!(t.phrases[0].target, vec!["p", "q"]);
        assert_eq!(t.phrases[1].source, Range::new(1, 2));
        assert_eq!(t.oovs, vec![false, false]);
    }
}
