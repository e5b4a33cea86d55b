use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

/// Count and packaging words that carry no identity.
const FILLER_WORDS: &[&str] = &[
    "roll", "rolls", "bag", "bags", "pcs", "pc", "each", "ea", "unit", "units", "piece", "pieces",
    "per", "of",
];

static INCH_MARK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(\d)\s*""#).expect("inch mark pattern"));
static FOOT_MARK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d)\s*'").expect("foot mark pattern"));
static INCH_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[^a-z])inch(?:es)?\b").expect("inch word pattern"));
static FOOT_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[^a-z])(?:feet|foot)\b").expect("foot word pattern"));
static DETACHED_UNIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d) (in|ft)\b").expect("detached unit pattern"));

/// Canonical form used for every comparison.
///
/// Lowercases, folds typographic quotes and dashes to ASCII, spells units as
/// `in`/`ft` attached to their number, drops punctuation (except `.`, `/`, `-`
/// between two digits), removes filler words and collapses whitespace.
/// Idempotent: `normalize(&normalize(s)) == normalize(s)`.
pub fn normalize(text: &str) -> String {
    let lowered: String = text.to_lowercase().chars().map(fold_typography).collect();

    let units = INCH_MARK.replace_all(&lowered, "${1}in ");
    let units = FOOT_MARK.replace_all(&units, "${1}ft ");
    let units = INCH_WORD.replace_all(&units, "${1}in");
    let units = FOOT_WORD.replace_all(&units, "${1}ft");

    let stripped = strip_punctuation(&units);

    let kept: Vec<&str> = stripped
        .split_whitespace()
        .filter(|word| !FILLER_WORDS.contains(word))
        .collect();
    let joined = kept.join(" ");

    DETACHED_UNIT.replace_all(&joined, "${1}${2}").into_owned()
}

/// Whitespace tokens of already-normalized text, deduplicated and ordered.
pub fn tokens(normalized: &str) -> BTreeSet<&str> {
    normalized.split_whitespace().collect()
}

fn fold_typography(c: char) -> char {
    match c {
        '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' => '\'',
        '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' => '"',
        '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2212}' => '-',
        '\u{00D7}' => 'x',
        other => other,
    }
}

fn strip_punctuation(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());

    for (i, &c) in chars.iter().enumerate() {
        if c.is_alphanumeric() || c.is_whitespace() {
            out.push(c);
            continue;
        }
        let between_digits = matches!(c, '.' | '/' | '-')
            && i > 0
            && chars[i - 1].is_ascii_digit()
            && chars.get(i + 1).is_some_and(char::is_ascii_digit);
        out.push(if between_digits { c } else { ' ' });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_collapses_whitespace() {
        assert_eq!(normalize("  Flex   DUCT\t"), "flex duct");
    }

    #[test]
    fn test_unit_spellings() {
        assert_eq!(normalize("6\" flex"), "6in flex");
        assert_eq!(normalize("6 inch flex"), "6in flex");
        assert_eq!(normalize("6 Inches flex"), "6in flex");
        assert_eq!(normalize("6 in. flex"), "6in flex");
        assert_eq!(normalize("25 feet"), "25ft");
        assert_eq!(normalize("25 ft."), "25ft");
        assert_eq!(normalize("25'"), "25ft");
    }

    #[test]
    fn test_typographic_quotes_and_dashes() {
        assert_eq!(normalize("6\u{201D} elbow"), "6in elbow");
        assert_eq!(normalize("1\u{2013}1/2\u{201D} pipe"), "1-1/2in pipe");
        assert_eq!(normalize("tape \u{2014} foil"), "tape foil");
    }

    #[test]
    fn test_filler_words_are_whole_tokens() {
        assert_eq!(normalize("2 rolls of foil tape"), "2 foil tape");
        assert_eq!(normalize("tape per roll"), "tape");
        // substrings of real words survive
        assert_eq!(normalize("unitary each-way bagger"), "unitary way bagger");
        assert_eq!(normalize("offset"), "offset");
    }

    #[test]
    fn test_punctuation_between_digits_survives() {
        assert_eq!(normalize("1.5in"), "1.5in");
        assert_eq!(normalize("3/4 pipe"), "3/4 pipe");
        assert_eq!(normalize("FLEX-6IN"), "flex 6in");
        assert_eq!(normalize("end."), "end");
        assert_eq!(normalize("w/ tape"), "w tape");
    }

    #[test]
    fn test_idempotent_examples() {
        for input in [
            "6 of in",
            "3 x Wye Fitting, 6\"",
            "Flex duct 25' R-8 (insulated)",
            "in.in. 6 in in",
            "1 1/2 in  – elbow",
            "",
            "   ",
            "\u{0130}stanbul",
        ] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn test_tokens_dedupes() {
        let normalized = normalize("tape tape foil");
        let toks = tokens(&normalized);
        assert_eq!(toks.len(), 2);
        assert!(toks.contains("foil"));
    }
}
