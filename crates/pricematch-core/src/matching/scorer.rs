use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::Serialize;
use strsim::normalized_levenshtein;

use super::category::{Category, CategoryRelation, Taxonomy};
use super::config::MatchConfig;
use super::normalizer::{normalize, tokens};
use super::numeric::{extract_numbers, numeric_proximity, NumericToken};
use super::synonyms::SynonymTable;
use crate::catalog::{CatalogItem, ItemField};

/// Text after synonym expansion and normalization, with everything the scorer
/// needs computed once.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedText {
    pub normalized: String,
    pub numbers: Vec<NumericToken>,
    pub categories: BTreeSet<Category>,
}

impl PreparedText {
    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }
}

/// A catalog item with its non-empty comparable fields prepared.
#[derive(Debug, Clone)]
pub struct PreparedItem<'a> {
    pub item: &'a CatalogItem,
    fields: Vec<(ItemField, PreparedText)>,
}

impl PreparedItem<'_> {
    pub fn fields(&self) -> &[(ItemField, PreparedText)] {
        &self.fields
    }
}

/// How one field scored. `category` is signed: positive for a shared
/// category, negative for a conflicting domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub field: ItemField,
    pub fuzzy: f64,
    pub numeric: f64,
    pub category: f64,
    pub score: f64,
}

/// Token-order-invariant similarity: shared tokens are compared against each
/// side's full sorted token list, so a description that is a token subset of
/// the other scores 1.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let left = tokens(a);
    let right = tokens(b);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let common: Vec<&str> = left.intersection(&right).copied().collect();
    let only_left: Vec<&str> = left.difference(&right).copied().collect();
    let only_right: Vec<&str> = right.difference(&left).copied().collect();

    let base = common.join(" ");
    let with_left = join_words(&base, &only_left);
    let with_right = join_words(&base, &only_right);

    let mut best = normalized_levenshtein(&with_left, &with_right);
    if !common.is_empty() {
        best = best
            .max(normalized_levenshtein(&base, &with_left))
            .max(normalized_levenshtein(&base, &with_right));
    }
    best.clamp(0.0, 1.0)
}

/// Substring-tolerant similarity: the shorter string against every same-width
/// window of the longer one that starts on a word.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let best = match a.chars().count().cmp(&b.chars().count()) {
        Ordering::Less => best_window(a, b),
        Ordering::Greater => best_window(b, a),
        Ordering::Equal => best_window(a, b).max(best_window(b, a)),
    };
    best.clamp(0.0, 1.0)
}

/// `max(token_set_ratio, partial_ratio)` over normalized text.
pub fn fuzzy_similarity(a: &str, b: &str) -> f64 {
    token_set_ratio(a, b).max(partial_ratio(a, b))
}

fn join_words(base: &str, extra: &[&str]) -> String {
    if extra.is_empty() {
        return base.to_string();
    }
    if base.is_empty() {
        return extra.join(" ");
    }
    format!("{base} {}", extra.join(" "))
}

fn best_window(short: &str, long: &str) -> f64 {
    let width = short.chars().count();
    let chars: Vec<char> = long.chars().collect();

    (0..chars.len())
        .filter(|&i| i == 0 || chars[i - 1] == ' ')
        .map(|start| {
            let end = (start + width).min(chars.len());
            let window: String = chars[start..end].iter().collect();
            normalized_levenshtein(short, &window)
        })
        .fold(0.0, f64::max)
}

/// Composite scorer: fuzzy text similarity, numeric proximity and category
/// semantics, weighted per [`MatchConfig`].
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    config: MatchConfig,
    synonyms: SynonymTable,
    taxonomy: Taxonomy,
}

impl Scorer {
    #[must_use]
    pub fn new(config: MatchConfig, synonyms: SynonymTable, taxonomy: Taxonomy) -> Self {
        Self {
            config,
            synonyms,
            taxonomy,
        }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn synonyms(&self) -> &SynonymTable {
        &self.synonyms
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// Expand synonyms and normalize. Applied identically to descriptions and
    /// catalog fields.
    pub fn prepare(&self, text: &str) -> PreparedText {
        let normalized = normalize(&self.synonyms.expand(&normalize(text)));
        let numbers = extract_numbers(&normalized);
        let categories = self.taxonomy.classify(tokens(&normalized));

        PreparedText {
            normalized,
            numbers,
            categories,
        }
    }

    pub fn prepare_item<'a>(&self, item: &'a CatalogItem) -> PreparedItem<'a> {
        let fields = item
            .fields()
            .into_iter()
            .map(|(field, text)| (field, self.prepare(text)))
            .filter(|(_, prepared)| !prepared.is_empty())
            .collect();

        PreparedItem { item, fields }
    }

    pub fn score_field(
        &self,
        query: &PreparedText,
        field: ItemField,
        candidate: &PreparedText,
    ) -> ScoreBreakdown {
        let fuzzy = fuzzy_similarity(&query.normalized, &candidate.normalized);
        let numeric = numeric_proximity(
            &query.numbers,
            &candidate.numbers,
            self.config.numeric_tolerance,
        );
        let category = match self.taxonomy.relation(&query.categories, &candidate.categories) {
            CategoryRelation::Shared => 1.0,
            CategoryRelation::Conflicting => -self.config.category_penalty,
            CategoryRelation::Neutral => 0.0,
        };

        let mut fuzzy_weight = self.config.fuzzy_weight;
        let mut numeric_weight = self.config.numeric_weight;
        let mut category_weight = self.config.category_weight;
        if self.config.redistribute_absent_signals {
            if query.numbers.is_empty() && candidate.numbers.is_empty() {
                fuzzy_weight += numeric_weight;
                numeric_weight = 0.0;
            }
            if query.categories.is_empty() && candidate.categories.is_empty() {
                fuzzy_weight += category_weight;
                category_weight = 0.0;
            }
        }

        let score = category_weight
            .mul_add(category, fuzzy_weight.mul_add(fuzzy, numeric_weight * numeric))
            .clamp(0.0, 1.0);

        ScoreBreakdown {
            field,
            fuzzy,
            numeric,
            category,
            score: if score.is_nan() { 0.0 } else { score },
        }
    }

    /// Best field wins; on a tie the earlier field (display name, description,
    /// code) is kept. `None` when the item has no comparable text at all.
    pub fn score_prepared(&self, query: &PreparedText, item: &PreparedItem<'_>) -> Option<ScoreBreakdown> {
        item.fields
            .iter()
            .map(|(field, text)| self.score_field(query, *field, text))
            .fold(None, |best: Option<ScoreBreakdown>, next| match best {
                Some(b) if b.score >= next.score => Some(b),
                _ => Some(next),
            })
    }

    /// Score one description against one item, in `[0, 1]`.
    pub fn score(&self, description: &str, item: &CatalogItem) -> f64 {
        let query = self.prepare(description);
        self.score_prepared(&query, &self.prepare_item(item))
            .map_or(0.0, |b| b.score)
    }
}
