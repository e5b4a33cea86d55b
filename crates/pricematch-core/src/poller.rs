use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::cache::{CatalogCache, CatalogSnapshot, PricebookSource};
use crate::catalog::MatchResult;
use crate::invoice::{invoice_lines, InvoiceLine};
use crate::matching::{Matcher, PreparedItem};
use crate::servicetitan::{ClientError, ClientResult, FormSubmission};
use crate::store::ProcessedForms;

/// Forms handled per cycle, counting only those with materials to match.
pub const MAX_FORMS_PER_CYCLE: usize = 5;

const LOOKBACK_MINUTES: i64 = 10;
const DEBUG_LOOKBACK_MINUTES: i64 = 60;

/// The remote calls a polling cycle needs.
#[async_trait::async_trait]
pub trait FieldServiceApi: PricebookSource {
    async fn recent_submissions(&self, since: DateTime<Utc>) -> ClientResult<Vec<FormSubmission>>;

    async fn invoice_for_job(&self, job_id: i64) -> ClientResult<Option<i64>>;

    async fn add_invoice_items(&self, invoice_id: i64, lines: &[InvoiceLine]) -> ClientResult<()>;
}

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("API error: {0}")]
    Client(#[from] ClientError),
}

pub type PollResult<T> = Result<T, PollError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollOptions {
    /// Look back an hour instead of ten minutes
    pub debug: bool,
    /// Match only; no invoice writes and nothing marked processed
    pub dry_run: bool,
}

impl PollOptions {
    pub fn lookback(&self) -> TimeDelta {
        if self.debug {
            TimeDelta::minutes(DEBUG_LOOKBACK_MINUTES)
        } else {
            TimeDelta::minutes(LOOKBACK_MINUTES)
        }
    }
}

/// What happened to a form's invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InvoiceOutcome {
    Updated { invoice_id: i64, lines: usize },
    NothingMatched { invoice_id: i64 },
    NoInvoice,
    DryRun { lines: usize },
    Failed { message: String },
}

impl InvoiceOutcome {
    /// Whether the form is done with. Failed forms are retried next cycle.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            Self::Updated { .. } | Self::NothingMatched { .. } | Self::NoInvoice
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormReport {
    pub form_id: i64,
    pub job_id: i64,
    pub parsed: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub unmatched_descriptions: Vec<String>,
    pub results: Vec<MatchResult>,
    pub invoice: InvoiceOutcome,
    pub marked_processed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub modified_since: DateTime<Utc>,
    pub dry_run: bool,
    pub catalog_items: usize,
    pub forms_fetched: usize,
    pub forms_skipped: usize,
    pub forms: Vec<FormReport>,
}

/// Turns recent job forms into invoice lines.
///
/// One cycle runs at a time; a second caller waits for the first to finish so
/// a form is never written to its invoice twice.
pub struct Poller<A: ?Sized> {
    api: Arc<A>,
    matcher: Matcher,
    cache: CatalogCache,
    processed: ProcessedForms,
    running: Mutex<()>,
}

impl<A: FieldServiceApi + ?Sized> Poller<A> {
    #[must_use]
    pub fn new(api: Arc<A>, matcher: Matcher, cache: CatalogCache, processed: ProcessedForms) -> Self {
        Self {
            api,
            matcher,
            cache,
            processed,
            running: Mutex::new(()),
        }
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn cache(&self) -> &CatalogCache {
        &self.cache
    }

    pub fn processed(&self) -> &ProcessedForms {
        &self.processed
    }

    /// The current catalog, refreshed if it has gone stale.
    pub async fn catalog(&self) -> ClientResult<Arc<CatalogSnapshot>> {
        self.cache.snapshot(self.api.as_ref()).await
    }

    pub async fn run_cycle(&self, options: PollOptions) -> PollResult<CycleReport> {
        self.run_cycle_at(options, Utc::now()).await
    }

    pub async fn run_cycle_at(
        &self,
        options: PollOptions,
        now: DateTime<Utc>,
    ) -> PollResult<CycleReport> {
        let _running = self.running.lock().await;
        tracing::info!("Starting polling cycle (debug: {}, dry run: {})", options.debug, options.dry_run);

        let snapshot = self.cache.snapshot_at(self.api.as_ref(), now).await?;
        let modified_since = now - options.lookback();
        let submissions = self.api.recent_submissions(modified_since).await?;

        let mut report = CycleReport {
            started_at: now,
            modified_since,
            dry_run: options.dry_run,
            catalog_items: snapshot.len(),
            forms_fetched: submissions.len(),
            forms_skipped: 0,
            forms: Vec::new(),
        };

        let mut pending = Vec::new();
        for form in &submissions {
            if pending.len() >= MAX_FORMS_PER_CYCLE {
                break;
            }
            let Some(job_id) = form.job_id() else {
                tracing::debug!("Form {} has no linked job", form.id);
                report.forms_skipped += 1;
                continue;
            };
            if self.processed.contains(form.id).await {
                report.forms_skipped += 1;
                continue;
            }
            let Some(text) = form.materials_text() else {
                tracing::warn!("No 'materials used' field on form {}", form.id);
                report.forms_skipped += 1;
                continue;
            };
            pending.push((form.id, job_id, text));
        }

        let prepared = self.matcher.prepare_catalog(&snapshot.items);
        for (form_id, job_id, text) in pending {
            let form = self
                .process_form(form_id, job_id, text, &prepared, options.dry_run)
                .await;
            report.forms.push(form);
        }

        tracing::info!(
            "Polling cycle done: {} forms handled, {} skipped",
            report.forms.len(),
            report.forms_skipped
        );
        Ok(report)
    }

    async fn process_form(
        &self,
        form_id: i64,
        job_id: i64,
        text: &str,
        catalog: &[PreparedItem<'_>],
        dry_run: bool,
    ) -> FormReport {
        let threshold = self.matcher.config().threshold;
        let entries = self.matcher.parse_lines(text);
        let results: Vec<MatchResult> = entries
            .iter()
            .map(|entry| self.matcher.rank_prepared(entry, catalog, threshold).result)
            .collect();

        let unmatched_descriptions: Vec<String> = entries
            .iter()
            .zip(&results)
            .filter(|(_, result)| !result.is_match())
            .map(|(entry, _)| entry.description.clone())
            .collect();
        for description in &unmatched_descriptions {
            tracing::warn!("Could not match {:?} on form {}", description, form_id);
        }

        let lines = invoice_lines(&entries, &results);
        let invoice = if dry_run {
            InvoiceOutcome::DryRun { lines: lines.len() }
        } else {
            self.write_invoice(job_id, &lines).await
        };

        let marked_processed =
            !dry_run && invoice.is_settled() && self.mark_processed(form_id).await;

        FormReport {
            form_id,
            job_id,
            parsed: entries.len(),
            matched: lines.len(),
            unmatched: unmatched_descriptions.len(),
            unmatched_descriptions,
            results,
            invoice,
            marked_processed,
        }
    }

    /// Record a settled form. A failed save is logged and the form is picked
    /// up again next cycle.
    async fn mark_processed(&self, form_id: i64) -> bool {
        match self.processed.mark(form_id).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Failed to record form {} as processed: {}", form_id, e);
                false
            }
        }
    }

    async fn write_invoice(&self, job_id: i64, lines: &[InvoiceLine]) -> InvoiceOutcome {
        let invoice_id = match self.api.invoice_for_job(job_id).await {
            Ok(Some(invoice_id)) => invoice_id,
            Ok(None) => {
                tracing::warn!("No invoice found for job {}", job_id);
                return InvoiceOutcome::NoInvoice;
            }
            Err(e) => {
                tracing::warn!("Invoice lookup failed for job {}: {}", job_id, e);
                return InvoiceOutcome::Failed {
                    message: e.to_string(),
                };
            }
        };

        if lines.is_empty() {
            return InvoiceOutcome::NothingMatched { invoice_id };
        }

        match self.api.add_invoice_items(invoice_id, lines).await {
            Ok(()) => InvoiceOutcome::Updated {
                invoice_id,
                lines: lines.len(),
            },
            Err(e) => {
                tracing::warn!("Failed to update invoice {}: {}", invoice_id, e);
                InvoiceOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }
}
