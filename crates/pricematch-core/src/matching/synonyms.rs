use std::collections::HashMap;

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::DiGraph;
use regex::{NoExpand, Regex};
use thiserror::Error;

/// Shop shorthand rewritten before comparison. Keys are whole words; the first
/// phrase is the replacement.
const DEFAULT_SYNONYMS: &[(&str, &[&str])] = &[
    ("ell", &["elbow"]),
    ("els", &["elbow"]),
    ("flx", &["flex"]),
    ("insul", &["insulation", "insulated"]),
    ("galv", &["galvanized"]),
    ("alum", &["aluminum", "aluminium"]),
    ("rnd", &["round"]),
    ("sq", &["square"]),
    ("reg", &["register"]),
    ("y", &["wye"]),
    ("takeoff", &["collar"]),
    ("duct tape", &["tape"]),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynonymError {
    #[error("Synonym key is empty")]
    EmptyKey,
    #[error("Synonym key {0:?} must start and end with a letter or digit")]
    InvalidKey(String),
    #[error("Synonym key {0:?} has no replacement phrase")]
    NoPhrases(String),
    #[error("Synonym key {0:?} is defined more than once")]
    Duplicate(String),
    #[error("Synonym pattern for {key:?} failed to compile: {message}")]
    Pattern { key: String, message: String },
    #[error("Synonym key {key:?} is part of an expansion cycle: {}", cycle.join(" -> "))]
    Cycle { key: String, cycle: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct SynonymRule {
    key: String,
    phrases: Vec<String>,
    pattern: Regex,
}

impl SynonymRule {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn replacement(&self) -> &str {
        &self.phrases[0]
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }
}

/// Validated synonym table.
///
/// Malformed entries and every entry on an expansion cycle are dropped at
/// construction and kept in [`SynonymTable::rejected`]. The surviving rules are
/// stored in dependency order, so a single pass expands chains fully and always
/// terminates.
#[derive(Debug, Clone)]
pub struct SynonymTable {
    rules: Vec<SynonymRule>,
    rejected: Vec<SynonymError>,
}

impl SynonymTable {
    pub fn new<I, K, P>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<P>)>,
        K: Into<String>,
        P: Into<String>,
    {
        let mut rejected = Vec::new();
        let mut candidates: Vec<SynonymRule> = Vec::new();

        for (key, phrases) in entries {
            let phrases = phrases.into_iter().map(Into::into).collect();
            match compile_rule(key.into(), phrases) {
                Ok(rule) if candidates.iter().any(|c| c.key == rule.key) => {
                    rejected.push(SynonymError::Duplicate(rule.key));
                }
                Ok(rule) => candidates.push(rule),
                Err(e) => rejected.push(e),
            }
        }

        let (rules, cyclic) = order_rules(candidates);
        rejected.extend(cyclic);

        for error in &rejected {
            tracing::warn!("Skipping synonym entry: {}", error);
        }

        Self { rules, rejected }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            rejected: Vec::new(),
        }
    }

    /// Replace every whole-word, case-insensitive occurrence of each key with
    /// its replacement phrase.
    pub fn expand(&self, text: &str) -> String {
        let mut out = text.to_string();
        for rule in &self.rules {
            if rule.pattern.is_match(&out) {
                out = rule
                    .pattern
                    .replace_all(&out, NoExpand(rule.replacement()))
                    .into_owned();
            }
        }
        out
    }

    pub fn rules(&self) -> &[SynonymRule] {
        &self.rules
    }

    pub fn rejected(&self) -> &[SynonymError] {
        &self.rejected
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for SynonymTable {
    fn default() -> Self {
        Self::new(
            DEFAULT_SYNONYMS
                .iter()
                .map(|(key, phrases)| (*key, phrases.to_vec())),
        )
    }
}

fn compile_rule(key: String, phrases: Vec<String>) -> Result<SynonymRule, SynonymError> {
    let key = key.trim().to_lowercase();
    if key.is_empty() {
        return Err(SynonymError::EmptyKey);
    }

    let starts_ok = key.chars().next().is_some_and(char::is_alphanumeric);
    let ends_ok = key.chars().last().is_some_and(char::is_alphanumeric);
    if !starts_ok || !ends_ok {
        return Err(SynonymError::InvalidKey(key));
    }

    let phrases: Vec<String> = phrases
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    if phrases.is_empty() {
        return Err(SynonymError::NoPhrases(key));
    }

    let pattern = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(&key))).map_err(|e| {
        SynonymError::Pattern {
            key: key.clone(),
            message: e.to_string(),
        }
    })?;

    Ok(SynonymRule {
        key,
        phrases,
        pattern,
    })
}

/// Split candidates into an acyclic, dependency-ordered rule list and the
/// errors for every rule that sits on a cycle (self-references included).
///
/// Edge `a -> b` means a's replacement contains b's key, so `a` must run first.
fn order_rules(candidates: Vec<SynonymRule>) -> (Vec<SynonymRule>, Vec<SynonymError>) {
    let mut graph = DiGraph::<usize, ()>::new();
    let nodes: Vec<_> = (0..candidates.len()).map(|i| graph.add_node(i)).collect();

    for (i, from) in candidates.iter().enumerate() {
        for (j, to) in candidates.iter().enumerate() {
            if to.pattern.is_match(from.replacement()) {
                graph.add_edge(nodes[i], nodes[j], ());
            }
        }
    }

    let mut on_cycle = vec![false; candidates.len()];
    let mut errors = Vec::new();

    for component in tarjan_scc(&graph) {
        let cyclic = component.len() > 1
            || graph.contains_edge(component[0], component[0]);
        if !cyclic {
            continue;
        }

        let mut members: Vec<usize> = component.iter().map(|n| graph[*n]).collect();
        members.sort_unstable();
        let cycle: Vec<String> = members.iter().map(|&i| candidates[i].key.clone()).collect();

        for &i in &members {
            on_cycle[i] = true;
            errors.push(SynonymError::Cycle {
                key: candidates[i].key.clone(),
                cycle: cycle.clone(),
            });
        }
    }

    let mut acyclic = DiGraph::<usize, ()>::new();
    let mut remap = HashMap::new();
    for (i, _) in candidates.iter().enumerate().filter(|(i, _)| !on_cycle[*i]) {
        remap.insert(i, acyclic.add_node(i));
    }
    for edge in graph.raw_edges() {
        let (a, b) = (graph[edge.source()], graph[edge.target()]);
        if let (Some(&na), Some(&nb)) = (remap.get(&a), remap.get(&b)) {
            acyclic.add_edge(na, nb, ());
        }
    }

    let order: Vec<usize> = toposort(&acyclic, None)
        .map(|sorted| sorted.into_iter().map(|n| acyclic[n]).collect())
        .unwrap_or_else(|_| acyclic.node_indices().map(|n| acyclic[n]).collect());

    let mut slots: Vec<Option<SynonymRule>> = candidates.into_iter().map(Some).collect();
    let rules = order.into_iter().filter_map(|i| slots[i].take()).collect();

    (rules, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_is_clean() {
        let table = SynonymTable::default();
        assert!(table.rejected().is_empty(), "{:?}", table.rejected());
        assert_eq!(table.len(), DEFAULT_SYNONYMS.len());
    }

    #[test]
    fn test_whole_word_case_insensitive() {
        let table = SynonymTable::default();
        assert_eq!(table.expand("6in ELL"), "6in elbow");
        assert_eq!(table.expand("shell"), "shell");
        assert_eq!(table.expand("Y fitting"), "wye fitting");
        assert_eq!(table.expand("yard"), "yard");
    }

    #[test]
    fn test_chain_expands_in_one_pass() {
        let table = SynonymTable::new(vec![
            ("d", vec!["e"]),
            ("c", vec!["d thing"]),
        ]);
        assert!(table.rejected().is_empty());
        assert_eq!(table.expand("c"), "e thing");
        assert_eq!(table.rules()[0].key(), "c");
    }

    #[test]
    fn test_self_reference_rejected() {
        let table = SynonymTable::new(vec![("flex", vec!["flex duct"])]);
        assert!(table.is_empty());
        assert!(matches!(
            &table.rejected()[0],
            SynonymError::Cycle { key, .. } if key == "flex"
        ));
        assert_eq!(table.expand("flex"), "flex");
    }

    #[test]
    fn test_mutual_cycle_rejected_rest_survives() {
        let table = SynonymTable::new(vec![
            ("a", vec!["b one"]),
            ("b", vec!["a two"]),
            ("ell", vec!["elbow"]),
        ]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.rejected().len(), 2);
        assert_eq!(table.expand("a ell"), "a elbow");
    }

    #[test]
    fn test_malformed_entries_skipped() {
        let table = SynonymTable::new(vec![
            ("", vec!["nothing"]),
            ("\"", vec!["inch"]),
            ("bare", vec!["  "]),
            ("ell", vec!["elbow"]),
            ("ELL", vec!["elbow fitting"]),
        ]);

        assert_eq!(table.len(), 1);
        let rejected = table.rejected();
        assert!(rejected.contains(&SynonymError::EmptyKey));
        assert!(rejected.contains(&SynonymError::InvalidKey("\"".into())));
        assert!(rejected.contains(&SynonymError::NoPhrases("bare".into())));
        assert!(rejected.contains(&SynonymError::Duplicate("ell".into())));
        assert_eq!(table.expand("ell"), "elbow");
    }

    #[test]
    fn test_multi_word_key() {
        let table = SynonymTable::default();
        assert_eq!(table.expand("Duct Tape"), "tape");
        assert_eq!(table.expand("flex duct taped"), "flex duct taped");
    }
}
