use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// `(category, domain, keywords)`. Categories in different domains contradict
/// each other; categories in the same domain merely differ.
const DEFAULT_TAXONOMY: &[(&str, &str, &[&str])] = &[
    ("flex", "duct", &["flex", "flexible", "duct"]),
    ("elbow", "duct", &["elbow", "90", "45"]),
    ("wrap", "duct", &["wrap", "insulation", "insulated", "blanket"]),
    ("tape", "duct", &["tape", "foil", "mastic"]),
    ("wye", "duct", &["wye"]),
    ("collar", "duct", &["collar", "takeoff", "starting"]),
    ("boot", "duct", &["boot"]),
    ("register", "duct", &["register", "grille", "diffuser"]),
    ("filter", "duct", &["filter", "merv"]),
    ("lineset", "refrigeration", &["lineset", "refrigerant", "r410a", "suction"]),
    ("drain", "plumbing", &["condensate", "drain", "pvc", "trap"]),
    (
        "electrical",
        "electrical",
        &["wire", "breaker", "conduit", "romex", "disconnect", "fuse", "whip", "thhn"],
    ),
];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().to_lowercase())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category: Category,
    pub domain: String,
    pub keywords: BTreeSet<String>,
}

impl CategoryRule {
    #[must_use]
    pub fn new<I, S>(category: &str, domain: &str, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            category: Category::new(category),
            domain: domain.to_lowercase(),
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryRelation {
    /// At least one category in common.
    Shared,
    /// Both sides categorized, nothing shared, and no domain in common.
    Conflicting,
    /// Anything else, including either side uncategorized.
    Neutral,
}

/// Keyword taxonomy used to tag normalized text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Taxonomy {
    rules: Vec<CategoryRule>,
}

impl Taxonomy {
    #[must_use]
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        Self { rules }
    }

    #[must_use]
    pub fn with_rule(mut self, rule: CategoryRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    /// Categories with at least one keyword present as a whole token.
    pub fn classify<'a, I>(&self, tokens: I) -> BTreeSet<Category>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let tokens: BTreeSet<&str> = tokens.into_iter().collect();
        self.rules
            .iter()
            .filter(|rule| rule.keywords.iter().any(|k| tokens.contains(k.as_str())))
            .map(|rule| rule.category.clone())
            .collect()
    }

    pub fn classify_text(&self, normalized: &str) -> BTreeSet<Category> {
        self.classify(normalized.split_whitespace())
    }

    pub fn relation(&self, query: &BTreeSet<Category>, candidate: &BTreeSet<Category>) -> CategoryRelation {
        if query.is_empty() || candidate.is_empty() {
            return CategoryRelation::Neutral;
        }
        if !query.is_disjoint(candidate) {
            return CategoryRelation::Shared;
        }

        let query_domains = self.domains(query);
        let candidate_domains = self.domains(candidate);
        if query_domains.is_disjoint(&candidate_domains) {
            CategoryRelation::Conflicting
        } else {
            CategoryRelation::Neutral
        }
    }

    fn domains(&self, categories: &BTreeSet<Category>) -> BTreeSet<&str> {
        self.rules
            .iter()
            .filter(|rule| categories.contains(&rule.category))
            .map(|rule| rule.domain.as_str())
            .collect()
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::new(
            DEFAULT_TAXONOMY
                .iter()
                .map(|(category, domain, keywords)| CategoryRule::new(category, domain, keywords.iter()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(set: &BTreeSet<Category>) -> Vec<&str> {
        set.iter().map(Category::as_str).collect()
    }

    #[test]
    fn test_classify_whole_tokens() {
        let taxonomy = Taxonomy::default();

        assert_eq!(names(&taxonomy.classify_text("6in flex duct")), vec!["flex"]);
        assert_eq!(names(&taxonomy.classify_text("90 elbow 6in")), vec!["elbow"]);
        assert!(taxonomy.classify_text("ducting taped").is_empty());
    }

    #[test]
    fn test_multiple_categories() {
        let taxonomy = Taxonomy::default();
        let cats = taxonomy.classify_text("foil tape for insulated flex");
        assert_eq!(names(&cats), vec!["flex", "tape", "wrap"]);
    }

    #[test]
    fn test_no_category_is_valid() {
        let taxonomy = Taxonomy::default();
        assert!(taxonomy.classify_text("misc supplies").is_empty());
    }

    #[test]
    fn test_relation() {
        let taxonomy = Taxonomy::default();
        let flex = taxonomy.classify_text("flex duct");
        let elbow = taxonomy.classify_text("elbow");
        let electrical = taxonomy.classify_text("30a disconnect");
        let none = taxonomy.classify_text("misc");

        assert_eq!(taxonomy.relation(&flex, &flex), CategoryRelation::Shared);
        assert_eq!(taxonomy.relation(&flex, &elbow), CategoryRelation::Neutral);
        assert_eq!(taxonomy.relation(&flex, &electrical), CategoryRelation::Conflicting);
        assert_eq!(taxonomy.relation(&none, &electrical), CategoryRelation::Neutral);
    }

    #[test]
    fn test_custom_rule() {
        let taxonomy = Taxonomy::new(Vec::new())
            .with_rule(CategoryRule::new("Pump", "plumbing", ["Pump", " "]));
        assert_eq!(names(&taxonomy.classify_text("condensate pump")), vec!["pump"]);
        assert_eq!(taxonomy.rules()[0].keywords.len(), 1);
    }
}
