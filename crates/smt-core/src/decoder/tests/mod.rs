use super::*;
use crate::testutil::GeneratorBuilder;

mod basic;
mod reordering;

/// Decodes `text` with both stack flavours and checks they agree.
fn translate_both(builder: impl Fn() -> GeneratorBuilder, text: &str) -> Translation {
    let sentence = SourceSentence::from_text(text);
    let histogram = translate(&builder().build(), &sentence).unwrap();
    let cube = builder().configure(|c| c.search.cube_pruning = true).build();
    let cube = translate(&cube, &sentence).unwrap();
    assert_eq!(histogram.tokens, cube.tokens, "cube pruning disagrees on {text:?}");
    assert!((histogram.score - cube.score).abs() < 1e-9);
    histogram
}

/// `a b` -> `x y` word for word, with a bigram model that much prefers
/// `y x`.
fn swap_generator() -> GeneratorBuilder {
    GeneratorBuilder::new()
        .phrase("a", "x", -0.1)
        .phrase("b", "y", -0.1)
        .ngram("x", -2.0, 0.0)
        .ngram("y", -2.0, 0.0)
        .ngram("</s>", -2.0, 0.0)
        .ngram("<s> y", -0.1, 0.0)
        .ngram("y x", -0.1, 0.0)
        .ngram("x </s>", -0.1, 0.0)
}
