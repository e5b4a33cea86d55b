use serde::{Deserialize, Serialize};

/// Line-splitting behaviour of the materials parser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Lines starting with this prefix (after trimming) are dropped.
    pub comment_prefix: Option<String>,
    /// Treat each comma-separated clause as its own entry.
    pub split_commas: bool,
    /// Read `3 wye` (a leading integer followed only by whitespace) as a count.
    /// Off by default because it misreads `90 elbow`.
    pub bare_leading_count: bool,
}

/// Scoring and ranking policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Weight of the fuzzy text similarity.
    pub fuzzy_weight: f64,
    /// Weight of the numeric/unit proximity.
    pub numeric_weight: f64,
    /// Weight of the category bonus (or penalty).
    pub category_weight: f64,
    /// Minimum score for a candidate to count as a match.
    pub threshold: f64,
    /// Largest relative gap between two numbers that still earns credit.
    pub numeric_tolerance: f64,
    /// Magnitude of the negative category signal when the query and a field
    /// belong to unrelated domains. `0.0` disables the penalty.
    pub category_penalty: f64,
    /// Fold the weight of a signal that neither side carries (no numbers on
    /// either side, no categories on either side) into the fuzzy weight.
    pub redistribute_absent_signals: bool,
    /// Number of ranked candidates kept for diagnostics.
    pub top_k: usize,
    pub parse: ParseOptions,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            fuzzy_weight: 0.5,
            numeric_weight: 0.3,
            category_weight: 0.2,
            threshold: 0.6,
            numeric_tolerance: 0.15,
            category_penalty: 1.0,
            redistribute_absent_signals: true,
            top_k: 3,
            parse: ParseOptions::default(),
        }
    }
}

impl MatchConfig {
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_weights(mut self, fuzzy: f64, numeric: f64, category: f64) -> Self {
        self.fuzzy_weight = fuzzy;
        self.numeric_weight = numeric;
        self.category_weight = category;
        self
    }

    #[must_use]
    pub fn with_parse_options(mut self, parse: ParseOptions) -> Self {
        self.parse = parse;
        self
    }

    pub fn validate(&self) -> Result<(), MatchConfigError> {
        for (name, weight) in [
            ("fuzzy_weight", self.fuzzy_weight),
            ("numeric_weight", self.numeric_weight),
            ("category_weight", self.category_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(MatchConfigError::InvalidWeight { name, value: weight });
            }
        }
        if self.fuzzy_weight + self.numeric_weight + self.category_weight <= 0.0 {
            return Err(MatchConfigError::ZeroWeights);
        }

        for (name, value) in [
            ("threshold", self.threshold),
            ("numeric_tolerance", self.numeric_tolerance),
            ("category_penalty", self.category_penalty),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(MatchConfigError::OutOfRange { name, value });
            }
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MatchConfigError {
    #[error("{name} must be a finite, non-negative number (got {value})")]
    InvalidWeight { name: &'static str, value: f64 },
    #[error("At least one scoring weight must be positive")]
    ZeroWeights,
    #[error("{name} must be within [0, 1] (got {value})")]
    OutOfRange { name: &'static str, value: f64 },
}
