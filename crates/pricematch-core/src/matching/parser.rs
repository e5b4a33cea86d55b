use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use super::config::ParseOptions;
use crate::catalog::ParsedEntry;

static EXPLICIT_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<qty>\d+)\s*[xX\u{00D7}*-](?P<gap>\s*)(?P<rest>.+)$")
        .expect("explicit count pattern")
});

static LEADING_MEASUREMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?ix)
        ^(?P<num>\d+[\ -]\d+/\d+ | \d+/\d+ | \d*\.\d+ | \d+)
        [\s-]*
        (?P<unit>["\u{201D}\u{2033}'\u{2019}\u{2032}] | (?:inches|inch|in|feet|foot|ft)\b\.?)
        (?P<rest>.*)$
        "#,
    )
    .expect("leading measurement pattern")
});

static BARE_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<qty>\d+)\s+(?P<rest>[^\d\s].*)$").expect("bare count pattern")
});

/// Which rule produced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineShape {
    /// `3 x wye fitting`, `2- 6in collars`
    ExplicitCount,
    /// `6" flex duct`, the measurement stays in the description
    LeadingMeasurement,
    /// `3 wye`, only when enabled
    BareCount,
    Fallback,
}

impl LineShape {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExplicitCount => "explicit_count",
            Self::LeadingMeasurement => "leading_measurement",
            Self::BareCount => "bare_count",
            Self::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for LineShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declarative line rule. `build` may still decline a match, in which case
/// the next rule is tried.
struct LineRule {
    shape: LineShape,
    pattern: &'static LazyLock<Regex>,
    build: fn(&Captures<'_>) -> Option<ParsedEntry>,
}

/// Tried top to bottom, first accepted match wins. Fallback is implicit.
static RULES: [LineRule; 3] = [
    LineRule {
        shape: LineShape::ExplicitCount,
        pattern: &EXPLICIT_COUNT,
        build: build_explicit_count,
    },
    LineRule {
        shape: LineShape::LeadingMeasurement,
        pattern: &LEADING_MEASUREMENT,
        build: build_leading_measurement,
    },
    LineRule {
        shape: LineShape::BareCount,
        pattern: &BARE_COUNT,
        build: build_bare_count,
    },
];

fn build_explicit_count(caps: &Captures<'_>) -> Option<ParsedEntry> {
    let rest = caps.name("rest")?.as_str().trim();

    // A separator glued to the next word is part of it: `6x8 register`,
    // `10-foot flex`, `2 xl filters`, `4-ton condenser`.
    let attached = caps.name("gap").is_none_or(|g| g.as_str().is_empty());
    if attached && rest.starts_with(char::is_alphanumeric) {
        return None;
    }

    let quantity = caps.name("qty")?.as_str().parse::<u32>().ok()?;
    ParsedEntry::new(quantity, rest)
}

fn build_leading_measurement(caps: &Captures<'_>) -> Option<ParsedEntry> {
    let number = caps.name("num")?.as_str();
    let unit = canonical_unit(caps.name("unit")?.as_str());
    let rest = caps.name("rest").map_or("", |m| m.as_str().trim());

    let description = if rest.is_empty() {
        format!("{number}{unit}")
    } else {
        format!("{number}{unit} {rest}")
    };
    ParsedEntry::new(1, description)
}

fn build_bare_count(caps: &Captures<'_>) -> Option<ParsedEntry> {
    let quantity = caps.name("qty")?.as_str().parse::<u32>().ok()?;
    ParsedEntry::new(quantity, caps.name("rest")?.as_str())
}

fn canonical_unit(unit: &str) -> &'static str {
    match unit.chars().next() {
        Some('"' | '\u{201D}' | '\u{2033}') => "in",
        Some(c) if c.eq_ignore_ascii_case(&'i') => "in",
        _ => "ft",
    }
}

/// Splits a materials note into quantity/description entries.
///
/// Never fails: a line no rule accepts becomes a quantity-1 entry holding the
/// whole trimmed line.
#[derive(Debug, Clone, Default)]
pub struct LineParser {
    options: ParseOptions,
}

impl LineParser {
    #[must_use]
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn parse(&self, text: &str) -> Vec<ParsedEntry> {
        self.parse_with_shapes(text)
            .into_iter()
            .map(|(_, entry)| entry)
            .collect()
    }

    /// Like [`LineParser::parse`], also reporting which rule produced each entry.
    pub fn parse_with_shapes(&self, text: &str) -> Vec<(LineShape, ParsedEntry)> {
        let mut entries = Vec::new();

        for line in text.lines().map(str::trim) {
            if line.is_empty() || self.is_comment(line) {
                continue;
            }

            if self.options.split_commas {
                entries.extend(
                    line.split(',')
                        .map(str::trim)
                        .filter(|clause| !clause.is_empty())
                        .map(|clause| self.parse_line(clause)),
                );
            } else {
                entries.push(self.parse_line(line));
            }
        }

        entries
    }

    /// Parse one non-blank, already-trimmed line.
    pub fn parse_line(&self, line: &str) -> (LineShape, ParsedEntry) {
        for rule in &RULES {
            if rule.shape == LineShape::BareCount && !self.options.bare_leading_count {
                continue;
            }
            if let Some(entry) = rule.pattern.captures(line).and_then(|caps| (rule.build)(&caps)) {
                return (rule.shape, entry);
            }
        }
        (LineShape::Fallback, ParsedEntry::single(line))
    }

    fn is_comment(&self, line: &str) -> bool {
        self.options
            .comment_prefix
            .as_deref()
            .is_some_and(|prefix| !prefix.is_empty() && line.starts_with(prefix))
    }
}

/// Parse with default options.
pub fn parse_lines(text: &str) -> Vec<ParsedEntry> {
    LineParser::default().parse(text)
}
