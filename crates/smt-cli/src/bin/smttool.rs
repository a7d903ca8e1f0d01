use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use smt_cli::commands::{candidates_ops, config_ops, decode_ops};
use smt_cli::loaders::ModelPaths;

#[derive(Parser)]
#[command(name = "smttool", about = "Phrase-based translation decoder")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct ModelArgs {
    /// Decoder config (TOML); built-in defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,
    /// Phrase table: `source ||| target ||| probs [a= adir...]` per line
    #[arg(long)]
    phrase_table: PathBuf,
    /// ARPA language model (repeat for several)
    #[arg(long)]
    lm: Vec<PathBuf>,
}

impl ModelArgs {
    fn paths(self) -> ModelPaths {
        ModelPaths {
            config: self.config,
            phrase_table: self.phrase_table,
            lms: self.lm,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Translate stdin, one sentence per line
    Decode {
        #[command(flatten)]
        models: ModelArgs,
        /// Output one JSON object per line
        #[arg(long)]
        json: bool,
        /// Number of decoding threads
        #[arg(long, default_value = "1")]
        threads: usize,
    },

    /// Show the candidate phrases and future scores of one sentence
    Candidates {
        #[command(flatten)]
        models: ModelArgs,
        /// Source sentence (markup allowed)
        sentence: String,
        /// Output as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Parse and validate a decoder config
    CheckConfig {
        /// Path to the TOML file
        file: PathBuf,
    },

    /// Print the default decoder config
    ExportConfig,
}

fn trace_dir() -> PathBuf {
    std::env::var_os("SMT_TRACE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
}

fn main() {
    smt_engine::init_tracing(&trace_dir());
    let cli = Cli::parse();

    match cli.command {
        Command::Decode {
            models,
            json,
            threads,
        } => decode_ops::decode_cmd(&models.paths(), json, threads),
        Command::Candidates {
            models,
            sentence,
            json,
        } => candidates_ops::candidates_cmd(&models.paths(), &sentence, json),
        Command::CheckConfig { file } => config_ops::config_check(&file),
        Command::ExportConfig => config_ops::config_export(),
    }
}
