use rayon::prelude::*;
use serde::Serialize;

use super::scorer::{PreparedItem, PreparedText, ScoreBreakdown, Scorer};
use crate::catalog::{ItemId, MatchResult};

/// A scored catalog item kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub item_id: ItemId,
    pub item_name: String,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// The decision for one entry plus the best-scoring candidates behind it.
/// The candidates never change the decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranking {
    pub result: MatchResult,
    pub candidates: Vec<Candidate>,
}

impl Ranking {
    pub fn top(&self) -> Option<&Candidate> {
        self.candidates.first()
    }
}

/// Score `query` against every prepared item, best first. Ties keep catalog
/// order, so the outcome does not depend on how the work was split up.
pub(crate) fn rank_prepared(
    scorer: &Scorer,
    query: &PreparedText,
    catalog: &[PreparedItem<'_>],
    threshold: f64,
    top_k: usize,
) -> Ranking {
    let mut scored: Vec<(usize, ScoreBreakdown)> = catalog
        .par_iter()
        .enumerate()
        .filter_map(|(index, item)| scorer.score_prepared(query, item).map(|b| (index, b)))
        .collect();

    scored.sort_by(|a, b| b.1.score.total_cmp(&a.1.score));

    let result = match scored.first() {
        Some((index, best)) if best.score >= threshold => {
            MatchResult::matched(catalog[*index].item, best.score)
        }
        _ => MatchResult::no_match(),
    };

    let candidates = scored
        .iter()
        .take(top_k)
        .map(|(index, breakdown)| {
            let item = catalog[*index].item;
            Candidate {
                item_id: item.id.clone(),
                item_name: item.display_name.clone(),
                score: breakdown.score,
                breakdown: *breakdown,
            }
        })
        .collect();

    Ranking { result, candidates }
}
