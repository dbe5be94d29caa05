use crate::config::WeightsConfig;
use serde::{Deserialize, Serialize};

const SUM_EPSILON: f64 = 1e-6;

/// Raw scores for the five judgment dimensions, each in `[0, 10]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DimensionScores {
    pub relevance: f64,
    pub willingness: f64,
    pub social: f64,
    pub timing: f64,
    pub continuity: f64,
}

impl DimensionScores {
    pub const MAX: f64 = 10.0;

    fn as_array(self) -> [f64; 5] {
        [
            self.relevance,
            self.willingness,
            self.social,
            self.timing,
            self.continuity,
        ]
    }
}

/// Normalized weight vector over the five dimensions.
///
/// Always sums to 1.0 (within floating error) once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    relevance: f64,
    willingness: f64,
    social: f64,
    timing: f64,
    continuity: f64,
}

impl ScoreWeights {
    /// Build from user-configured weights.
    ///
    /// Negative or non-finite entries count as zero. If the remaining sum is
    /// off from 1.0 every weight is divided by it; an all-zero vector falls
    /// back to equal weighting.
    pub fn from_raw(raw: &WeightsConfig) -> Self {
        let clean = |w: f64| if w.is_finite() && w > 0.0 { w } else { 0.0 };
        let weights = [
            clean(raw.relevance),
            clean(raw.willingness),
            clean(raw.social),
            clean(raw.timing),
            clean(raw.continuity),
        ];
        let sum: f64 = weights.iter().sum();

        if sum <= f64::EPSILON {
            tracing::warn!("all judgment weights are zero; falling back to equal weighting");
            return Self::equal();
        }

        if (sum - 1.0).abs() > SUM_EPSILON {
            tracing::warn!(sum, "judgment weights do not sum to 1; normalizing");
            return Self::from_array(weights.map(|w| w / sum));
        }

        Self::from_array(weights)
    }

    pub fn equal() -> Self {
        Self::from_array([0.2; 5])
    }

    fn from_array(w: [f64; 5]) -> Self {
        Self {
            relevance: w[0],
            willingness: w[1],
            social: w[2],
            timing: w[3],
            continuity: w[4],
        }
    }

    fn as_array(self) -> [f64; 5] {
        [
            self.relevance,
            self.willingness,
            self.social,
            self.timing,
            self.continuity,
        ]
    }

    pub fn sum(&self) -> f64 {
        self.as_array().iter().sum()
    }

    pub fn relevance(&self) -> f64 {
        self.relevance
    }

    pub fn willingness(&self) -> f64 {
        self.willingness
    }

    pub fn social(&self) -> f64 {
        self.social
    }

    pub fn timing(&self) -> f64 {
        self.timing
    }

    pub fn continuity(&self) -> f64 {
        self.continuity
    }

    /// `(Σ score_d · weight_d) / 10`, in `[0, 1]` for scores in `[0, 10]`.
    pub fn overall(&self, scores: &DimensionScores) -> f64 {
        let weighted: f64 = scores
            .as_array()
            .iter()
            .zip(self.as_array())
            .map(|(s, w)| s * w)
            .sum();
        (weighted / DimensionScores::MAX).clamp(0.0, 1.0)
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self::from_raw(&WeightsConfig::default())
    }
}
