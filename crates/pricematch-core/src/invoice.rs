use serde::{Deserialize, Serialize};

use crate::catalog::{ItemId, MatchResult, ParsedEntry};

/// One line added to an invoice: the matched SKU, the technician's quantity
/// and their original wording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLine {
    pub sku_id: ItemId,
    pub quantity: u32,
    pub description: String,
}

/// Pair entries with their results and keep the matched ones. Unmatched
/// entries produce no line.
pub fn invoice_lines(entries: &[ParsedEntry], results: &[MatchResult]) -> Vec<InvoiceLine> {
    if entries.len() != results.len() {
        tracing::warn!(
            "Got {} entries but {} match results; extra items are ignored",
            entries.len(),
            results.len()
        );
    }

    entries
        .iter()
        .zip(results)
        .filter_map(|(entry, result)| {
            result.item_id.as_ref().map(|sku_id| InvoiceLine {
                sku_id: sku_id.clone(),
                quantity: entry.quantity,
                description: entry.description.clone(),
            })
        })
        .collect()
}
