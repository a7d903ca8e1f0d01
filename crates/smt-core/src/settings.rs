//! Decoder configuration loaded from TOML.
//!
//! - `parse_config_toml(toml)` parses and validates a user config
//! - every key is optional; missing keys take the embedded defaults
//!   (`include_str!("default_config.toml")`)
//! - the config is passed explicitly to the model generator, never stored
//!   in a global

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_CONFIG_TOML: &str = include_str!("default_config.toml");

/// Returns the embedded default config TOML content.
pub fn default_toml() -> &'static str {
    DEFAULT_CONFIG_TOML
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("TOML parse error: {0}")]
    Parse(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecoderConfig {
    pub search: SearchSettings,
    pub distortion: DistortionSettings,
    pub lm: LmSettings,
    pub phrase_table: PhraseTableSettings,
    pub weights: Weights,
    pub features: Vec<FeatureSpec>,
    /// Decode right to left; the output is reversed back at the end.
    pub backwards: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            search: SearchSettings::default(),
            distortion: DistortionSettings::default(),
            lm: LmSettings::default(),
            phrase_table: PhraseTableSettings::default(),
            weights: Weights::default(),
            features: Vec::new(),
            backwards: false,
        }
    }
}

impl DecoderConfig {
    /// Stack size used by the histogram decoder.
    pub fn histogram_stack_size(&self) -> usize {
        self.search.regular_stack_size.unwrap_or(self.search.stack_size)
    }

    /// Whether the caller will want more than the single best hypothesis.
    pub fn wants_full_final_stack(&self) -> bool {
        self.search.keep_recombined || self.search.nbest_size > 0
    }

    /// Size of the last histogram stack: 1 when only the best translation is
    /// needed, the n-best size when that is smaller than the stack.
    pub fn final_stack_size(&self) -> usize {
        let size = self.histogram_stack_size();
        if !self.wants_full_final_stack() {
            1
        } else if !self.search.keep_recombined && self.search.nbest_size < size {
            self.search.nbest_size
        } else {
            size
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        validate(self)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchSettings {
    pub stack_size: usize,
    pub regular_stack_size: Option<usize>,
    pub prune_threshold: f64,
    pub cov_limit: usize,
    pub cov_threshold: f64,
    /// Survivors each coverage may keep past `stack_size`.
    pub diversity: usize,
    /// Caps diversity survivors at `stack_size + diversity_increment` pops;
    /// 0 leaves the diversity floor uncapped.
    pub diversity_increment: usize,
    pub cube_pruning: bool,
    pub keep_recombined: bool,
    pub nbest_size: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            stack_size: 100,
            regular_stack_size: None,
            prune_threshold: 0.0001,
            cov_limit: 0,
            cov_threshold: 0.0,
            diversity: 0,
            diversity_increment: 0,
            cube_pruning: false,
            keep_recombined: false,
            nbest_size: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DistLimitVariant {
    /// A jump back from the end of the new phrase to the first gap must fit.
    Standard,
    /// The new phrase must start within the limit of the first gap, and the
    /// sentence must still be completable.
    Extended,
    /// Only the distance from the first gap to the new phrase start counts.
    Simple,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DistortionSettings {
    pub limit: i64,
    pub variant: DistLimitVariant,
    pub phrase_swap: bool,
    pub itg: bool,
    pub itg_limit: i64,
}

impl Default for DistortionSettings {
    fn default() -> Self {
        Self {
            limit: -1,
            variant: DistLimitVariant::Standard,
            phrase_swap: false,
            itg: false,
            itg_limit: -1,
        }
    }
}

impl DistortionSettings {
    /// `None` means unlimited.
    pub fn limit(&self) -> Option<usize> {
        usize::try_from(self.limit).ok()
    }

    pub fn itg_limit(&self) -> Option<usize> {
        usize::try_from(self.itg_limit).ok()
    }
}

/// How the LM contributes to a phrase's precomputed score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LmHeuristic {
    None,
    Unigram,
    /// Each word scored with the preceding words of the same phrase.
    Incremental,
    /// Only words that have a full-order context inside the phrase.
    Simple,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LmSettings {
    pub order: usize,
    pub max_context_size: Option<usize>,
    pub minimize_context_size: bool,
    pub future_heuristic: LmHeuristic,
    pub cube_heuristic: LmHeuristic,
}

impl Default for LmSettings {
    fn default() -> Self {
        Self {
            order: 0,
            max_context_size: None,
            minimize_context_size: false,
            future_heuristic: LmHeuristic::Incremental,
            cube_heuristic: LmHeuristic::Incremental,
        }
    }
}

/// Score used to rank candidates for phrase-table pruning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PruningCriterion {
    /// The candidate's precomputed partial score.
    Full,
    ForwardWeights,
    BackwardWeights,
    Combined,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhraseTableSettings {
    pub size_limit: usize,
    pub threshold: f64,
    pub pruning: PruningCriterion,
    pub weight_marked: f64,
    pub bypass_marked: bool,
    pub future_use_forward: bool,
}

impl Default for PhraseTableSettings {
    fn default() -> Self {
        Self {
            size_limit: 0,
            threshold: 0.0,
            pruning: PruningCriterion::Full,
            weight_marked: 1.0,
            bypass_marked: false,
            future_use_forward: true,
        }
    }
}

/// Log-linear weights of the translation and language models.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Weights {
    pub backward: Vec<f64>,
    pub forward: Vec<f64>,
    pub adir: Vec<f64>,
    pub lm: Vec<f64>,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            backward: vec![1.0],
            forward: Vec::new(),
            adir: Vec::new(),
            lm: vec![1.0],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureKind {
    WordDisplacement,
    PhraseDisplacement,
    LeftDistance,
    ZeroInfo,
    SegmentCount,
    Bernoulli,
    Length,
    Walls,
    Sparse,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureSpec {
    pub kind: FeatureKind,
    #[serde(default = "default_feature_weight")]
    pub weight: f64,
    #[serde(default)]
    pub arg: Option<String>,
}

fn default_feature_weight() -> f64 {
    1.0
}

pub fn parse_config_toml(toml_str: &str) -> Result<DecoderConfig, SettingsError> {
    let config: DecoderConfig =
        toml::from_str(toml_str).map_err(|e| SettingsError::Parse(e.to_string()))?;
    validate(&config)?;
    Ok(config)
}

fn validate(c: &DecoderConfig) -> Result<(), SettingsError> {
    macro_rules! invalid {
        ($field:expr, $reason:expr) => {
            return Err(SettingsError::InvalidValue {
                field: $field.to_string(),
                reason: $reason.to_string(),
            })
        };
    }
    macro_rules! check_ratio {
        ($section:ident . $field:ident) => {
            if !(0.0..=1.0).contains(&c.$section.$field) {
                invalid!(
                    concat!(stringify!($section), ".", stringify!($field)),
                    "must be in [0, 1]"
                );
            }
        };
    }
    macro_rules! check_positive_usize {
        ($section:ident . $field:ident) => {
            if c.$section.$field == 0 {
                invalid!(
                    concat!(stringify!($section), ".", stringify!($field)),
                    "must be positive"
                );
            }
        };
    }
    macro_rules! check_at_least_minus_one {
        ($section:ident . $field:ident) => {
            if c.$section.$field < -1 {
                invalid!(
                    concat!(stringify!($section), ".", stringify!($field)),
                    "must be -1 (unlimited) or non-negative"
                );
            }
        };
    }

    check_positive_usize!(search.stack_size);
    check_ratio!(search.prune_threshold);
    check_ratio!(search.cov_threshold);
    check_ratio!(phrase_table.threshold);
    check_at_least_minus_one!(distortion.limit);
    check_at_least_minus_one!(distortion.itg_limit);

    match c.search.regular_stack_size {
        Some(0) => invalid!("search.regular_stack_size", "must be positive"),
        Some(_) if c.search.cube_pruning => invalid!(
            "search.regular_stack_size",
            "cannot be combined with search.cube_pruning; size the cube with search.stack_size"
        ),
        _ => {}
    }
    if c.search.diversity_increment > 0 && c.search.diversity == 0 {
        invalid!("search.diversity_increment", "requires search.diversity");
    }
    if c.search.cube_pruning && (c.search.cov_limit > 0 || c.search.diversity > 0) {
        invalid!(
            "search.cube_pruning",
            "coverage pruning and diversity apply to the histogram stack only"
        );
    }
    if c.phrase_table.weight_marked.is_nan() || c.phrase_table.weight_marked <= 0.0 {
        invalid!("phrase_table.weight_marked", "must be positive");
    }
    if let Some(0) = c.lm.max_context_size {
        invalid!("lm.max_context_size", "must be positive");
    }
    let w = &c.weights;
    let all_weights = w.backward.iter().chain(&w.forward).chain(&w.adir).chain(&w.lm);
    if all_weights.into_iter().any(|x| !x.is_finite()) {
        invalid!("weights", "must be finite");
    }
    for (i, f) in c.features.iter().enumerate() {
        if !f.weight.is_finite() {
            invalid!(format!("features[{i}].weight"), "must be finite");
        }
    }
    if c.distortion.phrase_swap && c.distortion.variant == DistLimitVariant::Simple {
        warn!("distortion.phrase_swap with the simple distortion limit: swaps are checked against the previous phrase, which the simple limit ignores");
    }

    Ok(())
}
