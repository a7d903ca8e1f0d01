//! Text loaders for the models `smttool` decodes with.

mod arpa;
mod phrase_table;

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use smt_core::lm::LanguageModel;
use smt_core::settings::SettingsError;
use smt_core::{parse_config_toml, DecoderConfig, ModelError, ModelGenerator, Vocabulary};

pub use arpa::read_arpa;
pub use phrase_table::{read_phrase_table, TableLayout};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}:{line}: {reason}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("config: {0}")]
    Config(#[from] SettingsError),

    #[error("model: {0}")]
    Model(#[from] ModelError),
}

/// Line-level failure inside one reader; the caller attaches the path.
#[derive(Debug)]
pub(crate) enum ReadError {
    Io(io::Error),
    Parse { line: usize, reason: String },
}

impl From<io::Error> for ReadError {
    fn from(e: io::Error) -> Self {
        ReadError::Io(e)
    }
}

impl ReadError {
    pub(crate) fn parse(line: usize, reason: impl Into<String>) -> Self {
        ReadError::Parse {
            line,
            reason: reason.into(),
        }
    }

    fn at(self, path: &Path) -> LoadError {
        match self {
            ReadError::Io(source) => LoadError::Io {
                path: path.to_path_buf(),
                source,
            },
            ReadError::Parse { line, reason } => LoadError::Parse {
                path: path.to_path_buf(),
                line,
                reason,
            },
        }
    }
}

fn open(path: &Path) -> Result<BufReader<File>, LoadError> {
    File::open(path).map(BufReader::new).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a TOML decoder config, or the built-in defaults when `path` is
/// `None`.
pub fn load_config(path: Option<&Path>) -> Result<DecoderConfig, LoadError> {
    let Some(path) = path else {
        return Ok(DecoderConfig::default());
    };
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_config_toml(&text)?)
}

/// Files a decoding session is built from.
#[derive(Debug, Clone, Default)]
pub struct ModelPaths {
    pub config: Option<PathBuf>,
    pub phrase_table: PathBuf,
    pub lms: Vec<PathBuf>,
}

/// Loads the config, the phrase table and every LM, and checks them
/// against each other.
pub fn load_generator(paths: &ModelPaths) -> Result<ModelGenerator, LoadError> {
    let config = load_config(paths.config.as_deref())?;
    let vocab = Arc::new(Vocabulary::new());

    let layout = TableLayout {
        backward: config.weights.backward.len(),
        reverse: config.backwards,
    };
    let table = read_phrase_table(open(&paths.phrase_table)?, &vocab, &layout)
        .map_err(|e| e.at(&paths.phrase_table))?;

    let mut lms: Vec<Arc<dyn LanguageModel>> = Vec::with_capacity(paths.lms.len());
    for path in &paths.lms {
        let lm = read_arpa(open(path)?, &vocab).map_err(|e| e.at(path))?;
        lms.push(Arc::new(lm));
    }

    Ok(ModelGenerator::new(config, vocab, Arc::new(table), lms)?)
}
