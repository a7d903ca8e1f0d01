use super::{bad_arg, DecoderFeature};
use crate::candidates::PhraseCandidate;
use crate::hypothesis::Hypothesis;
use crate::logprob::{log_prob, LOG_ZERO};

/// Minus one per phrase.
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentCount;

impl DecoderFeature for SegmentCount {
    fn name(&self) -> &str {
        "SegmentCount"
    }

    fn precompute_future_score(&self, _phrase: &PhraseCandidate) -> f64 {
        -1.0
    }

    fn score(&self, h: &Hypothesis) -> f64 {
        if h.is_initial() {
            0.0
        } else {
            -1.0
        }
    }

    fn box_clone(&self) -> Box<dyn DecoderFeature> {
        Box::new(*self)
    }
}

/// Geometric segmentation model: a phrase of k source words has log
/// probability `ln q + (k - 1) ln (1 - q)`.
#[derive(Debug, Clone, Copy)]
pub struct Bernoulli {
    log_q: f64,
    log_not_q: f64,
}

impl Bernoulli {
    pub fn new(q: f64) -> Self {
        Self {
            log_q: log_prob(q),
            log_not_q: log_prob(1.0 - q),
        }
    }

    pub(crate) fn from_arg(arg: Option<&str>) -> Result<Self, crate::settings::SettingsError> {
        let raw = arg.ok_or_else(|| bad_arg("bernoulli", "missing q"))?;
        let q: f64 = raw
            .trim()
            .parse()
            .map_err(|_| bad_arg("bernoulli", format!("not a number: {raw}")))?;
        if !(q > 0.0 && q <= 1.0) {
            return Err(bad_arg("bernoulli", "q must be in (0, 1]"));
        }
        Ok(Self::new(q))
    }

    fn phrase_log_prob(&self, len: usize) -> f64 {
        match len {
            0 => 0.0,
            1 => self.log_q,
            _ if self.log_not_q == LOG_ZERO => LOG_ZERO,
            _ => self.log_q + (len - 1) as f64 * self.log_not_q,
        }
    }
}

impl DecoderFeature for Bernoulli {
    fn name(&self) -> &str {
        "Bernoulli"
    }

    fn precompute_future_score(&self, phrase: &PhraseCandidate) -> f64 {
        self.phrase_log_prob(phrase.span.len())
    }

    fn score(&self, h: &Hypothesis) -> f64 {
        self.phrase_log_prob(h.phrase().span.len())
    }

    fn box_clone(&self) -> Box<dyn DecoderFeature> {
        Box::new(*self)
    }
}
