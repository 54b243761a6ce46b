//! Apply phase
//!
//! Persists the accepted results of a completed job, window by window, and is
//! the only place the token balance is debited. Tokens are reserved on the
//! control task before a window is dispatched, then committed for the
//! languages the store confirmed and released for everything else. Once all windows have settled the
//! local catalog is merged optimistically and a confirmatory reload is
//! scheduled.

use super::progress::{Phase, ProgressReporter, ProgressUpdate};
use super::reconcile::{schedule_reload, ReloadHandle};
use super::types::{GenerationReport, GenerationResult};
use super::window::{plan_windows, settle_all, DEFAULT_WINDOW_SIZE};
use crate::abstractions::{
    ApplyOptions, CatalogSource, PersistenceClient, PersistenceRequest, SeoResult,
};
use crate::catalog::{normalize_languages, CatalogState, LanguageCode};
use crate::error::{CatalystError, ErrorCode, Result};
use crate::ledger::{LedgerSnapshot, Reservation, TokenLedger};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Delay before the post-apply reload
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplyStatus {
    Applied,
    Failed { message: String },
    /// Reservation refused; nothing was persisted
    Unfunded { required: u64, available: u64 },
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResult {
    pub entity_id: String,
    #[serde(flatten)]
    pub status: ApplyStatus,
    pub languages_applied: BTreeSet<LanguageCode>,
    pub tokens_debited: u64,
}

impl ApplyResult {
    pub fn is_applied(&self) -> bool {
        self.status == ApplyStatus::Applied
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReport {
    pub job_id: Uuid,
    /// In the order of the generation results
    pub results: Vec<ApplyResult>,
    pub applied: usize,
    pub failed: usize,
    pub tokens_debited: u64,
    /// Ledger after all commits
    pub ledger: LedgerSnapshot,
    pub applied_at: DateTime<Utc>,
}

/// Result of an apply run plus the pending reload, if one was scheduled
#[derive(Debug)]
pub struct ApplyOutcome {
    pub report: ApplyReport,
    pub reload: Option<ReloadHandle>,
}

/// Commits accepted generation results
pub struct ApplyPhase {
    persistence: Arc<dyn PersistenceClient>,
    window_size: usize,
    settle_delay: Duration,
    reload_source: Option<Arc<dyn CatalogSource>>,
    progress: ProgressReporter,
}

impl ApplyPhase {
    pub fn new(persistence: Arc<dyn PersistenceClient>) -> Self {
        Self {
            persistence,
            window_size: DEFAULT_WINDOW_SIZE,
            settle_delay: DEFAULT_SETTLE_DELAY,
            reload_source: None,
            progress: ProgressReporter::disabled(),
        }
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size.max(1);
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Source to re-read applied entities from after the settle delay
    pub fn with_reload_source(mut self, source: Arc<dyn CatalogSource>) -> Self {
        self.reload_source = Some(source);
        self
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Persist the accepted results of `report`
    ///
    /// Refuses reports that did not complete. Individual persistence failures
    /// are recorded and never stop the run.
    pub async fn run(
        &self,
        report: &GenerationReport,
        ledger: LedgerSnapshot,
        state: &mut CatalogState,
    ) -> Result<ApplyOutcome> {
        if !report.is_completed() {
            return Err(CatalystError::job(
                ErrorCode::JOB_NOT_COMPLETED,
                format!("job is {}; only completed jobs can be applied", report.state),
                Some(report.job_id.to_string()),
            ));
        }

        let accepted: Vec<&GenerationResult> = report.accepted().collect();
        let mut ledger = TokenLedger::new(ledger, report.billing.policy);
        let options = ApplyOptions {
            ai_enhanced: report.mode.is_ai(),
            model: Some(report.model.clone()),
        };
        info!(
            "Applying {} accepted result(s) from job {}",
            accepted.len(),
            report.job_id
        );

        let mut slots: Vec<Option<ApplyResult>> = vec![None; accepted.len()];
        let mut processed = 0;

        for window in plan_windows(accepted.len(), self.window_size) {
            let offset = window.start;
            let batch = &accepted[window];

            let mut reservations: HashMap<usize, Reservation> = HashMap::new();
            let mut funded = Vec::with_capacity(batch.len());
            for (i, result) in batch.iter().enumerate() {
                let cost = report.billing.cost_for(result.languages_applied.len());
                match ledger.reserve(cost) {
                    Ok(reservation) => {
                        reservations.insert(offset + i, reservation);
                        funded.push((offset + i, *result));
                    }
                    Err(e) => {
                        warn!("Skipping {}: {}", result.entity_id, e);
                        slots[offset + i] = Some(ApplyResult {
                            entity_id: result.entity_id.clone(),
                            status: ApplyStatus::Unfunded {
                                required: e.required,
                                available: e.available,
                            },
                            languages_applied: BTreeSet::new(),
                            tokens_debited: 0,
                        });
                    }
                }
            }

            let settled = settle_all(funded.into_iter().map(|(index, result)| {
                let persistence = Arc::clone(&self.persistence);
                let request = PersistenceRequest {
                    entity_id: result.entity_id.clone(),
                    results: result
                        .payload()
                        .unwrap_or_default()
                        .iter()
                        .map(|c| SeoResult {
                            language: c.language.clone(),
                            seo: c.data.clone(),
                        })
                        .collect(),
                    options: options.clone(),
                };
                async move { (index, result, persistence.persist(request).await) }
            }))
            .await;

            for (index, result, response) in settled {
                let Some(reservation) = reservations.remove(&index) else {
                    continue;
                };
                let applied = match response {
                    Ok(response) if response.ok => {
                        let languages = confirmed_languages(result, &response.applied_languages);
                        if languages.is_empty() {
                            Err("store confirmed none of the generated languages".to_string())
                        } else {
                            Ok(languages)
                        }
                    }
                    Ok(response) => Err(response
                        .error
                        .unwrap_or_else(|| "persistence rejected the content".to_string())),
                    Err(failure) => Err(failure.to_string()),
                };

                slots[index] = Some(match applied {
                    Ok(languages) => {
                        let cost = report.billing.cost_for(languages.len());
                        let debited = ledger.commit_up_to(reservation, cost)?;
                        debug!("Applied {} ({} tokens)", result.entity_id, debited);
                        ApplyResult {
                            entity_id: result.entity_id.clone(),
                            status: ApplyStatus::Applied,
                            languages_applied: languages,
                            tokens_debited: debited,
                        }
                    }
                    Err(message) => {
                        ledger.release(reservation)?;
                        warn!("Failed to apply {}: {}", result.entity_id, message);
                        ApplyResult {
                            entity_id: result.entity_id.clone(),
                            status: ApplyStatus::Failed { message },
                            languages_applied: BTreeSet::new(),
                            tokens_debited: 0,
                        }
                    }
                });
            }

            processed += batch.len();
            self.progress.emit(ProgressUpdate {
                phase: Phase::Apply,
                processed_count: processed,
                total_count: accepted.len(),
                current_label: batch
                    .last()
                    .map(|r| r.title.clone())
                    .unwrap_or_default(),
            });
        }

        let results: Vec<ApplyResult> = slots.into_iter().flatten().collect();
        let applied_at = Utc::now();

        let mut applied_ids = Vec::new();
        for result in results.iter().filter(|r| r.is_applied()) {
            if !state.merge_applied(
                &result.entity_id,
                &result.languages_applied,
                report.mode.is_ai(),
                applied_at,
            ) {
                warn!("{} is not tracked locally; merge skipped", result.entity_id);
            }
            applied_ids.push(result.entity_id.clone());
        }

        let reload = match &self.reload_source {
            Some(source) if !applied_ids.is_empty() => Some(schedule_reload(
                Arc::clone(source),
                applied_ids,
                self.settle_delay,
            )),
            _ => None,
        };

        let applied = results.iter().filter(|r| r.is_applied()).count();
        let tokens_debited = results.iter().map(|r| r.tokens_debited).sum();
        info!(
            "Applied {} of {} result(s), {} tokens debited",
            applied,
            results.len(),
            tokens_debited
        );

        Ok(ApplyOutcome {
            report: ApplyReport {
                job_id: report.job_id,
                failed: results.len() - applied,
                applied,
                tokens_debited,
                ledger: ledger.snapshot(),
                results,
                applied_at,
            },
            reload,
        })
    }
}

/// Languages the store confirmed, limited to what was generated
///
/// An empty confirmation list means everything sent was stored.
fn confirmed_languages(result: &GenerationResult, confirmed: &[LanguageCode]) -> BTreeSet<LanguageCode> {
    if confirmed.is_empty() {
        return result.languages_applied.clone();
    }
    normalize_languages(confirmed)
        .intersection(&result.languages_applied)
        .cloned()
        .collect()
}
