pub mod candidates;
pub mod coverage;
pub mod decoder;
pub mod features;
pub mod hypothesis;
pub mod lm;
pub mod logprob;
pub mod model;
pub mod sentence;
pub mod settings;
pub mod stack;
pub mod vocab;

#[cfg(test)]
pub(crate) mod testutil;

pub use decoder::{translate, DecodeError, DecodeOutput, Decoder, PhraseAlignment, Translation};
pub use model::{ModelError, ModelGenerator, ScoreModel, SentenceModel};
pub use sentence::{MarkedTranslation, SourceSentence};
pub use settings::{parse_config_toml, DecoderConfig};
pub use vocab::{Vocabulary, WordId};
