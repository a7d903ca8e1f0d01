//! Batch front end for the `smt_core` phrase-based decoder.
//!
//! `smt_core` decodes one sentence at a time on the calling thread. This
//! crate adds the process-level pieces: a pool of decode workers sharing
//! one [`ModelGenerator`] and opt-in JSON tracing.

pub mod batch;
mod trace_init;

pub use batch::{BatchError, BatchTranslator};
pub use smt_core;
pub use smt_core::{
    parse_config_toml, translate, DecodeError, DecoderConfig, MarkedTranslation, ModelError,
    ModelGenerator, SourceSentence, Translation, Vocabulary,
};
pub use trace_init::init_tracing;
