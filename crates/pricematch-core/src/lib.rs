pub mod cache;
pub mod catalog;
pub mod error;
pub mod invoice;
pub mod matching;
pub mod poller;
pub mod servicetitan;
pub mod store;

pub use cache::{CatalogCache, CatalogSnapshot, PricebookSource};
pub use catalog::{CatalogItem, ItemField, ItemId, MatchResult, ParsedEntry};
pub use error::{Error, Result};
pub use invoice::{invoice_lines, InvoiceLine};
pub use matching::{
    match_entries, parse_lines, Candidate, MatchConfig, MatchConfigError, Matcher,
    MatcherBuilder, ParseOptions, Ranking, ScoreBreakdown, SynonymTable, Taxonomy,
};
pub use poller::{
    CycleReport, FieldServiceApi, FormReport, InvoiceOutcome, PollError, PollOptions, Poller,
};
pub use servicetitan::{ServiceTitanClient, ServiceTitanConfig};
pub use store::{ProcessedForms, StoreError};
