//! Generate phase orchestration
//!
//! `PREPARING → RUNNING → {COMPLETED, ABORTED}`
//!
//! Preparing runs every gate that can be decided without a network call:
//! entitlements, per-entity language deltas, plan limits and affordability.
//! Running dispatches non-skipped entities window by window. A store-wide
//! failure (plan, trial or tokens) stops the job at the next window boundary;
//! anything else is recorded against the entity and the job carries on.

use super::classifier::{classify, ErrorClass};
use super::diff::diff;
use super::progress::{Phase, ProgressReporter, ProgressUpdate};
use super::types::{
    AbortReason, Billing, GenerationJob, GenerationReport, GenerationResult, JobAbort, JobState,
    JobSummary, LimitViolation, OptimizationMode, Outcome, ResultDetail,
};
use super::window::{plan_windows, settle_all};
use crate::abstractions::{GeneratedContent, GenerationClient, GenerationRequest};
use crate::catalog::{normalize_language, EntityKind, LanguageCode, OptimizableEntity};
use crate::ledger::{LedgerSnapshot, TokenLedger};
use crate::plan::{Access, Entitlement, Feature};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default token cost of one generated language on metered plans
pub const DEFAULT_TOKENS_PER_LANGUAGE: u64 = 1;

/// One entity that needs a generation call
#[derive(Debug, Clone)]
pub struct WorkItem {
    /// Position in the job's entity list
    pub position: usize,
    pub entity: OptimizableEntity,
    pub new_languages: BTreeSet<LanguageCode>,
}

/// Outcome of the preparing state when no gate tripped
#[derive(Debug, Clone)]
pub struct PreparedJob {
    pub work: Vec<WorkItem>,
    /// Positions of entities that need nothing
    pub skipped: Vec<usize>,
    pub required_features: Vec<Feature>,
    pub billing: Billing,
    pub total_cost: u64,
}

/// Features a job needs, in the order they are checked
pub fn required_features(job: &GenerationJob) -> Vec<Feature> {
    let mut features = Vec::new();
    if job.entities.iter().any(|e| e.kind == EntityKind::Product) {
        features.push(Feature::ProductOptimization);
    }
    if job.entities.iter().any(|e| e.kind == EntityKind::Collection) {
        features.push(Feature::CollectionOptimization);
    }
    if job.mode == OptimizationMode::AiEnhanced {
        features.push(Feature::AiEnhancement);
        if job.entities.len() > 1 {
            features.push(Feature::BulkAiEnhancement);
        }
    }
    features
}

/// Run every pre-flight gate; no collaborator is touched
///
/// Gates run in order: feature entitlements, per-entity language limit,
/// product limit (counting only products with new work), affordability.
pub fn prepare_job(
    job: &GenerationJob,
    entitlement: &Entitlement,
    ledger: &LedgerSnapshot,
    tokens_per_language: u64,
    now: DateTime<Utc>,
) -> Result<PreparedJob, JobAbort> {
    let abort = |reason: AbortReason, entity_id: Option<String>| JobAbort {
        during: JobState::Preparing,
        reason,
        entity_id,
    };

    let features = required_features(job);
    for feature in &features {
        if let Access::Locked {
            required_plan,
            requires_activation,
        } = entitlement.check(*feature, now)
        {
            debug!("Feature {} locked for plan {}", feature, entitlement.tier().key);
            let class = if requires_activation {
                ErrorClass::TrialRestriction {
                    requires_activation: true,
                }
            } else {
                ErrorClass::PlanRestriction {
                    required_plan: Some(required_plan),
                }
            };
            return Err(abort(AbortReason::Blocked(class), None));
        }
    }

    let mut work = Vec::new();
    let mut skipped = Vec::new();
    for (position, entity) in job.entities.iter().enumerate() {
        let delta = diff(entity, &job.languages, entitlement.language_limit);
        if delta.limit_exceeded {
            return Err(abort(
                AbortReason::LimitExceeded(LimitViolation::Languages {
                    entity_id: entity.id.clone(),
                    projected: delta.projected_total,
                    limit: entitlement.language_limit,
                }),
                Some(entity.id.clone()),
            ));
        }
        if delta.is_skip() {
            skipped.push(position);
        } else {
            work.push(WorkItem {
                position,
                entity: entity.clone(),
                new_languages: delta.new_languages,
            });
        }
    }

    let products = work.iter().filter(|w| w.entity.is_product()).count();
    if products > entitlement.product_limit {
        return Err(abort(
            AbortReason::LimitExceeded(LimitViolation::Products {
                requested: products,
                limit: entitlement.product_limit,
            }),
            None,
        ));
    }

    let billing = Billing::new(entitlement.token_policy(), job.mode, tokens_per_language);
    let total_cost = work
        .iter()
        .map(|w| billing.cost_for(w.new_languages.len()))
        .fold(0u64, u64::saturating_add);

    let ledger = TokenLedger::new(*ledger, billing.policy);
    if !ledger.can_afford(total_cost) {
        let available = ledger.available();
        return Err(abort(
            AbortReason::Blocked(ErrorClass::InsufficientTokens {
                required: total_cost,
                available,
                needed: total_cost.saturating_sub(available),
            }),
            None,
        ));
    }

    Ok(PreparedJob {
        work,
        skipped,
        required_features: features,
        billing,
        total_cost,
    })
}

/// Drives the generate phase of a batch optimization job
pub struct BatchOrchestrator {
    generator: Arc<dyn GenerationClient>,
    tokens_per_language: u64,
    progress: ProgressReporter,
}

impl BatchOrchestrator {
    pub fn new(generator: Arc<dyn GenerationClient>) -> Self {
        Self {
            generator,
            tokens_per_language: DEFAULT_TOKENS_PER_LANGUAGE,
            progress: ProgressReporter::disabled(),
        }
    }

    pub fn with_tokens_per_language(mut self, tokens: u64) -> Self {
        self.tokens_per_language = tokens;
        self
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// See [`prepare_job`]
    pub fn prepare(
        &self,
        job: &GenerationJob,
        entitlement: &Entitlement,
        ledger: &LedgerSnapshot,
        now: DateTime<Utc>,
    ) -> Result<PreparedJob, JobAbort> {
        prepare_job(job, entitlement, ledger, self.tokens_per_language, now)
    }

    /// Run the generate phase to a terminal state
    pub async fn run(
        &self,
        job: GenerationJob,
        entitlement: &Entitlement,
        ledger: LedgerSnapshot,
    ) -> GenerationReport {
        let job_id = Uuid::new_v4();
        let started_at = Utc::now();
        let total = job.entities.len();
        info!(
            "Preparing job {} with {} entities for {} language(s)",
            job_id,
            total,
            job.languages.len()
        );

        let mut report = GenerationReport {
            job_id,
            state: JobState::Preparing,
            abort: None,
            results: Vec::new(),
            summary: JobSummary {
                total,
                ..JobSummary::default()
            },
            mode: job.mode,
            model: job.model.clone(),
            billing: Billing::new(entitlement.token_policy(), job.mode, self.tokens_per_language),
            ledger,
            calls_issued: 0,
            windows_dispatched: 0,
            started_at,
            finished_at: started_at,
        };

        let prepared = match self.prepare(&job, entitlement, &ledger, started_at) {
            Ok(prepared) => prepared,
            Err(abort) => {
                warn!("Job {} aborted while preparing: {}", job_id, abort.reason);
                report.state = JobState::Aborted;
                report.abort = Some(abort);
                report.summary.not_dispatched = total;
                report.finished_at = Utc::now();
                return report;
            }
        };

        report.billing = prepared.billing;
        report.state = JobState::Running;

        let mut slots: Vec<Option<GenerationResult>> = vec![None; total];
        for &position in &prepared.skipped {
            slots[position] = Some(GenerationResult::skipped(&job.entities[position]));
        }

        let work_total = prepared.work.len();
        info!(
            "Job {} running: {} to generate, {} skipped, estimated cost {} tokens",
            job_id,
            work_total,
            prepared.skipped.len(),
            prepared.total_cost
        );

        let mut processed = 0;
        for window in plan_windows(work_total, job.window_size) {
            let batch = &prepared.work[window];
            report.windows_dispatched += 1;
            report.calls_issued += batch.len();
            debug!(
                "Job {} window {}: dispatching {} request(s)",
                job_id,
                report.windows_dispatched,
                batch.len()
            );

            let settled = settle_all(batch.iter().map(|item| {
                let generator = Arc::clone(&self.generator);
                let request = GenerationRequest {
                    entity_id: item.entity.id.clone(),
                    kind: item.entity.kind,
                    languages: item.new_languages.iter().cloned().collect(),
                    model: job.model.clone(),
                    ai_enhanced: job.mode.is_ai(),
                };
                async move {
                    let started = Instant::now();
                    let result = generator.generate(request).await;
                    (item, result, started.elapsed())
                }
            }))
            .await;

            let mut last_label = String::new();
            for (item, result, duration) in settled {
                let detail = match result {
                    Ok(response) => accept_response(item, response.results),
                    Err(failure) => {
                        let class = classify(&failure);
                        debug!("Entity {} failed: {}", item.entity.id, class);
                        ResultDetail::Failed(class)
                    }
                };
                let languages_applied = match &detail {
                    ResultDetail::Generated(content) => {
                        content.iter().map(|c| c.language.clone()).collect()
                    }
                    _ => BTreeSet::new(),
                };
                last_label = item.entity.title.clone();
                slots[item.position] = Some(GenerationResult {
                    entity_id: item.entity.id.clone(),
                    title: item.entity.title.clone(),
                    detail,
                    languages_applied,
                    duration,
                });
            }

            processed += batch.len();
            self.progress.emit(ProgressUpdate {
                phase: Phase::Generate,
                processed_count: processed,
                total_count: work_total,
                current_label: last_label,
            });

            // Earliest entity in job order decides when several are job-wide
            let blocking = batch.iter().find_map(|item| {
                slots[item.position]
                    .as_ref()
                    .and_then(|r| r.error())
                    .filter(|class| class.is_job_wide())
                    .map(|class| (item.entity.id.clone(), class.clone()))
            });

            if let Some((entity_id, class)) = blocking {
                warn!(
                    "Job {} aborted after window {}: {} (entity {})",
                    job_id, report.windows_dispatched, class, entity_id
                );
                report.abort = Some(JobAbort {
                    during: JobState::Running,
                    reason: AbortReason::Blocked(class),
                    entity_id: Some(entity_id),
                });
                break;
            }
        }

        report.state = if report.abort.is_some() {
            JobState::Aborted
        } else {
            JobState::Completed
        };
        report.summary = summarize(&slots);
        report.results = slots.into_iter().flatten().collect();
        report.finished_at = Utc::now();

        info!(
            "Job {} {}: {} succeeded, {} skipped, {} failed, {} not dispatched",
            job_id,
            report.state,
            report.summary.succeeded,
            report.summary.skipped,
            report.summary.failed,
            report.summary.not_dispatched
        );

        report
    }
}

/// Keep only content for languages that were asked for, one entry per
/// normalized code
fn accept_response(item: &WorkItem, content: Vec<GeneratedContent>) -> ResultDetail {
    let mut seen = BTreeSet::new();
    let accepted: Vec<GeneratedContent> = content
        .into_iter()
        .filter_map(|c| {
            let language = normalize_language(&c.language);
            (item.new_languages.contains(&language) && seen.insert(language.clone()))
                .then_some(GeneratedContent { language, ..c })
        })
        .collect();

    if accepted.is_empty() {
        ResultDetail::Failed(ErrorClass::Generic {
            message: "response contained no content for the requested languages".to_string(),
        })
    } else {
        if accepted.len() < item.new_languages.len() {
            warn!(
                "Entity {}: {} of {} languages generated",
                item.entity.id,
                accepted.len(),
                item.new_languages.len()
            );
        }
        ResultDetail::Generated(accepted)
    }
}

fn summarize(slots: &[Option<GenerationResult>]) -> JobSummary {
    let mut summary = JobSummary {
        total: slots.len(),
        ..JobSummary::default()
    };
    for slot in slots {
        match slot.as_ref().map(GenerationResult::outcome) {
            Some(Outcome::Success) => summary.succeeded += 1,
            Some(Outcome::Skipped) => summary.skipped += 1,
            Some(Outcome::Failed) => summary.failed += 1,
            None => summary.not_dispatched += 1,
        }
    }
    summary
}
