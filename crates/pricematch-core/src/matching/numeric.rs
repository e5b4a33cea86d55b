use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// Mixed fractions (`1-1/2`, `1 1/2`), plain fractions, then decimals, each
/// optionally followed by an attached `in`/`ft`. Alternation order matters:
/// the regex engine takes the first branch that matches at a position.
static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        (?:
            (?P<whole>\d+)[\ -](?P<mnum>\d+)/(?P<mden>\d+)
          | (?P<num>\d+)/(?P<den>\d+)
          | (?P<dec>\d+(?:\.\d+)?|\.\d+)
        )
        (?:(?P<unit>in|ft)\b)?
        ",
    )
    .expect("number pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Inch,
    Foot,
}

impl Unit {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inch => "in",
            Self::Foot => "ft",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "in" => Some(Self::Inch),
            "ft" => Some(Self::Foot),
            _ => None,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dimension or bare number pulled out of normalized text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericToken {
    pub value: f64,
    pub unit: Option<Unit>,
}

impl NumericToken {
    #[must_use]
    pub fn new(value: f64, unit: Option<Unit>) -> Self {
        Self { value, unit }
    }

    /// Closeness to `other` in `[0, 1]`: 1 for equal values, `1 - rel` while the
    /// relative gap `rel` stays under `tolerance`, otherwise 0. Tokens with
    /// different units never match.
    pub fn proximity(&self, other: &Self, tolerance: f64) -> f64 {
        if self.unit != other.unit {
            return 0.0;
        }
        if (self.value - other.value).abs() < f64::EPSILON {
            return 1.0;
        }

        let largest = self.value.abs().max(other.value.abs());
        if largest <= f64::EPSILON {
            return 0.0;
        }

        let relative = (self.value - other.value).abs() / largest;
        if relative < tolerance {
            (1.0 - relative).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

impl fmt::Display for NumericToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = (self.value * 1000.0).round() / 1000.0;
        write!(f, "{rounded}")?;
        if let Some(unit) = self.unit {
            write!(f, "{unit}")?;
        }
        Ok(())
    }
}

/// Every number in `normalized`, in order of appearance, duplicates kept.
pub fn extract_numbers(normalized: &str) -> Vec<NumericToken> {
    NUMBER
        .captures_iter(normalized)
        .filter_map(|caps| {
            let value = token_value(&caps)?;
            let unit = caps.name("unit").and_then(|m| Unit::parse(m.as_str()));
            Some(NumericToken::new(value, unit))
        })
        .collect()
}

/// Fraction of `query` tokens that found a counterpart in `candidate`, graded
/// by closeness. Zero when either side has no tokens.
pub fn numeric_proximity(query: &[NumericToken], candidate: &[NumericToken], tolerance: f64) -> f64 {
    if query.is_empty() || candidate.is_empty() {
        return 0.0;
    }

    let total: f64 = query
        .iter()
        .map(|q| {
            candidate
                .iter()
                .map(|c| q.proximity(c, tolerance))
                .fold(0.0, f64::max)
        })
        .sum();

    #[allow(clippy::cast_precision_loss)]
    let score = total / query.len() as f64;
    score.clamp(0.0, 1.0)
}

fn token_value(caps: &Captures<'_>) -> Option<f64> {
    let number = |name: &str| caps.name(name).and_then(|m| m.as_str().parse::<f64>().ok());

    let value = if let (Some(whole), Some(num), Some(den)) =
        (number("whole"), number("mnum"), number("mden"))
    {
        fraction(num, den).map(|f| whole + f)
    } else if let (Some(num), Some(den)) = (number("num"), number("den")) {
        fraction(num, den)
    } else {
        number("dec")
    };

    value.filter(|v| v.is_finite())
}

fn fraction(num: f64, den: f64) -> Option<f64> {
    if den == 0.0 {
        return None;
    }
    Some(num / den)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(text: &str) -> Vec<String> {
        extract_numbers(text).iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_units_and_bare_numbers() {
        assert_eq!(values("6in 90 elbow"), vec!["6in", "90"]);
        assert_eq!(values("flex duct 25ft"), vec!["25ft"]);
        assert_eq!(values("1.5in pipe"), vec!["1.5in"]);
    }

    #[test]
    fn test_fractions() {
        assert_eq!(values("1-1/2in pipe"), vec!["1.5in"]);
        assert_eq!(values("1 1/2in pipe"), vec!["1.5in"]);
        assert_eq!(values("3/4 fitting"), vec!["0.75"]);
    }

    #[test]
    fn test_zero_denominator_is_skipped() {
        assert!(extract_numbers("1/0").is_empty());
        assert_eq!(values("2 3/0in"), Vec::<String>::new());
    }

    #[test]
    fn test_duplicates_preserved_in_order() {
        assert_eq!(values("6in to 8in to 6in"), vec!["6in", "8in", "6in"]);
    }

    #[test]
    fn test_dimension_pairs() {
        assert_eq!(values("10x6 register"), vec!["10", "6"]);
    }

    #[test]
    fn test_unit_must_end_token() {
        assert_eq!(values("6inx"), vec!["6"]);
        assert_eq!(values("r8 insulated"), vec!["8"]);
    }

    #[test]
    fn test_proximity() {
        let nine = NumericToken::new(9.0, Some(Unit::Inch));
        let ten = NumericToken::new(10.0, Some(Unit::Inch));
        let six = NumericToken::new(6.0, Some(Unit::Inch));
        let ten_ft = NumericToken::new(10.0, Some(Unit::Foot));

        assert!((nine.proximity(&nine, 0.15) - 1.0).abs() < 1e-9);
        assert!((nine.proximity(&ten, 0.15) - 0.9).abs() < 1e-9);
        assert!(nine.proximity(&six, 0.15).abs() < 1e-9);
        assert!(nine.proximity(&ten_ft, 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_proximity_zero_values() {
        let zero = NumericToken::new(0.0, None);
        let one = NumericToken::new(1.0, None);
        assert!((zero.proximity(&zero, 0.15) - 1.0).abs() < 1e-9);
        assert!(zero.proximity(&one, 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_numeric_proximity_aggregate() {
        let query = extract_numbers("9in 90");
        let candidate = extract_numbers("10in 90 elbow");
        let score = numeric_proximity(&query, &candidate, 0.15);
        assert!((score - 0.95).abs() < 1e-9);

        assert!(numeric_proximity(&query, &[], 0.15).abs() < 1e-9);
        assert!(numeric_proximity(&[], &candidate, 0.15).abs() < 1e-9);
    }
}
