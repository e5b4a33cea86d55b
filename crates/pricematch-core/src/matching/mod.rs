mod category;
mod config;
mod normalizer;
mod numeric;
mod parser;
mod ranker;
mod scorer;
mod synonyms;

use std::sync::LazyLock;

use rayon::prelude::*;

pub use category::{Category, CategoryRelation, CategoryRule, Taxonomy};
pub use config::{MatchConfig, MatchConfigError, ParseOptions};
pub use normalizer::{normalize, tokens};
pub use numeric::{extract_numbers, numeric_proximity, NumericToken, Unit};
pub use parser::{parse_lines, LineParser, LineShape};
pub use ranker::{Candidate, Ranking};
pub use scorer::{
    fuzzy_similarity, partial_ratio, token_set_ratio, PreparedItem, PreparedText,
    ScoreBreakdown, Scorer,
};
pub use synonyms::{SynonymError, SynonymRule, SynonymTable};

use crate::catalog::{CatalogItem, MatchResult, ParsedEntry};

static DEFAULT_MATCHER: LazyLock<Matcher> = LazyLock::new(Matcher::default);

/// Parser and scorer bundled behind one configuration.
///
/// Holds no state between calls; every ranking is computed fresh against the
/// catalog slice it is given.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    parser: LineParser,
    scorer: Scorer,
}

impl Matcher {
    pub fn new(config: MatchConfig) -> Result<Self, MatchConfigError> {
        Self::builder().config(config).build()
    }

    #[must_use]
    pub fn builder() -> MatcherBuilder {
        MatcherBuilder::default()
    }

    pub fn config(&self) -> &MatchConfig {
        self.scorer.config()
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    pub fn parse_lines(&self, text: &str) -> Vec<ParsedEntry> {
        self.parser.parse(text)
    }

    pub fn score(&self, description: &str, item: &CatalogItem) -> f64 {
        self.scorer.score(description, item)
    }

    /// Prepare every catalog field once so it can be ranked against many entries.
    pub fn prepare_catalog<'a>(&self, catalog: &'a [CatalogItem]) -> Vec<PreparedItem<'a>> {
        catalog
            .par_iter()
            .map(|item| self.scorer.prepare_item(item))
            .collect()
    }

    pub fn rank(&self, entry: &ParsedEntry, catalog: &[CatalogItem], threshold: f64) -> Ranking {
        let prepared = self.prepare_catalog(catalog);
        self.rank_prepared(entry, &prepared, threshold)
    }

    pub fn rank_prepared(
        &self,
        entry: &ParsedEntry,
        catalog: &[PreparedItem<'_>],
        threshold: f64,
    ) -> Ranking {
        let query = self.scorer.prepare(&entry.description);
        let ranking = ranker::rank_prepared(
            &self.scorer,
            &query,
            catalog,
            threshold,
            self.config().top_k,
        );

        match ranking.top() {
            Some(top) => tracing::debug!(
                "Ranked {:?}: best {} ({:.3}, {}), matched: {}",
                entry.description,
                top.item_name,
                top.score,
                top.breakdown.field,
                ranking.result.is_match()
            ),
            None => tracing::debug!("Ranked {:?}: no comparable items", entry.description),
        }

        ranking
    }

    /// One ranking per entry, in entry order.
    pub fn rank_all(
        &self,
        entries: &[ParsedEntry],
        catalog: &[CatalogItem],
        threshold: f64,
    ) -> Vec<Ranking> {
        if entries.is_empty() {
            return Vec::new();
        }
        let prepared = self.prepare_catalog(catalog);
        entries
            .iter()
            .map(|entry| self.rank_prepared(entry, &prepared, threshold))
            .collect()
    }

    /// One result per entry, in entry order.
    pub fn match_entries(
        &self,
        entries: &[ParsedEntry],
        catalog: &[CatalogItem],
        threshold: f64,
    ) -> Vec<MatchResult> {
        self.rank_all(entries, catalog, threshold)
            .into_iter()
            .map(|ranking| ranking.result)
            .collect()
    }

    /// Parse `text` and rank every entry at the configured threshold.
    pub fn match_text(
        &self,
        text: &str,
        catalog: &[CatalogItem],
    ) -> Vec<(ParsedEntry, Ranking)> {
        let entries = self.parse_lines(text);
        let rankings = self.rank_all(&entries, catalog, self.config().threshold);
        entries.into_iter().zip(rankings).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MatcherBuilder {
    config: MatchConfig,
    synonyms: Option<SynonymTable>,
    taxonomy: Option<Taxonomy>,
}

impl MatcherBuilder {
    #[must_use]
    pub fn config(mut self, config: MatchConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn synonyms(mut self, synonyms: SynonymTable) -> Self {
        self.synonyms = Some(synonyms);
        self
    }

    #[must_use]
    pub fn taxonomy(mut self, taxonomy: Taxonomy) -> Self {
        self.taxonomy = Some(taxonomy);
        self
    }

    pub fn build(self) -> Result<Matcher, MatchConfigError> {
        self.config.validate()?;
        Ok(Matcher {
            parser: LineParser::new(self.config.parse.clone()),
            scorer: Scorer::new(
                self.config,
                self.synonyms.unwrap_or_default(),
                self.taxonomy.unwrap_or_default(),
            ),
        })
    }
}

/// Match parsed entries against a catalog with the default policy and the
/// given threshold. One result per entry, same order.
pub fn match_entries(
    entries: &[ParsedEntry],
    catalog: &[CatalogItem],
    threshold: f64,
) -> Vec<MatchResult> {
    DEFAULT_MATCHER.match_entries(entries, catalog, threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ItemId;

    fn catalog() -> Vec<CatalogItem> {
        vec![
            CatalogItem::new(10_i64, "6in Flex Duct").with_code("FLEX-6IN"),
            CatalogItem::new(11_i64, "Wye Fitting 6in"),
            CatalogItem::new(12_i64, "Foil Tape").with_code("TAPE-FOIL"),
        ]
    }

    #[test]
    fn test_match_entries_keeps_order() {
        let entries = parse_lines("2 x foil tape\nmisc supplies\n6\" flex duct");
        let results = match_entries(&entries, &catalog(), 0.6);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].item_id, Some(ItemId::Number(12)));
        assert!(!results[1].is_match());
        assert_eq!(results[2].item_id, Some(ItemId::Number(10)));
    }

    #[test]
    fn test_empty_inputs() {
        assert!(match_entries(&[], &catalog(), 0.6).is_empty());

        let entries = parse_lines("foil tape");
        let results = match_entries(&entries, &[], 0.6);
        assert_eq!(results, vec![MatchResult::no_match()]);
    }

    #[test]
    fn test_builder_rejects_bad_config() {
        let result = Matcher::builder()
            .config(MatchConfig::default().with_threshold(-0.1))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_custom_synonyms() {
        let matcher = Matcher::builder()
            .synonyms(SynonymTable::new(vec![("ft", vec!["foil tape"])]))
            .build()
            .unwrap();
        let entries = vec![ParsedEntry::single("roll of ft")];
        let results = matcher.match_entries(&entries, &catalog(), 0.6);
        assert_eq!(results[0].item_id, Some(ItemId::Number(12)));
    }

    #[test]
    fn test_match_text_uses_configured_parser() {
        let matcher = Matcher::new(MatchConfig::default().with_parse_options(ParseOptions {
            split_commas: true,
            ..ParseOptions::default()
        }))
        .unwrap();

        let matched = matcher.match_text("3 x wye fitting, foil tape", &catalog());
        assert_eq!(matched.len(), 2);
        assert_eq!(matched[0].0.quantity, 3);
        assert_eq!(matched[0].1.result.item_id, Some(ItemId::Number(11)));
        assert_eq!(matched[1].1.result.item_id, Some(ItemId::Number(12)));
    }
}
