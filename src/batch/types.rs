//! Job, result and report types for batch optimization

use super::classifier::{ErrorClass, RequiredAction};
use super::window::DEFAULT_WINDOW_SIZE;
use crate::abstractions::GeneratedContent;
use crate::catalog::{normalize_languages, LanguageCode, OptimizableEntity};
use crate::ledger::LedgerSnapshot;
use crate::plan::TokenPolicy;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Default model identifier passed to the generation service
pub const DEFAULT_MODEL: &str = "seo-standard";

/// Whether generation uses the token-funded AI enhancement
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptimizationMode {
    #[default]
    Basic,
    AiEnhanced,
}

impl OptimizationMode {
    pub fn is_ai(self) -> bool {
        matches!(self, Self::AiEnhanced)
    }
}

/// A batch of entities and the languages to optimize them for
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub entities: Vec<OptimizableEntity>,
    pub languages: BTreeSet<LanguageCode>,
    pub window_size: usize,
    pub mode: OptimizationMode,
    pub model: String,
}

impl GenerationJob {
    pub fn new<I, S>(entities: Vec<OptimizableEntity>, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            entities,
            languages: normalize_languages(languages),
            window_size: DEFAULT_WINDOW_SIZE,
            mode: OptimizationMode::Basic,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size.max(1);
        self
    }

    pub fn with_mode(mut self, mode: OptimizationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Terminal per-entity outcome
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Success,
    Skipped,
    Failed,
}

/// Payload or error of a per-entity result
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum ResultDetail {
    Generated(Vec<GeneratedContent>),
    Skipped,
    Failed(ErrorClass),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub entity_id: String,
    pub title: String,
    pub detail: ResultDetail,
    pub languages_applied: BTreeSet<LanguageCode>,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
}

impl GenerationResult {
    pub fn skipped(entity: &OptimizableEntity) -> Self {
        Self {
            entity_id: entity.id.clone(),
            title: entity.title.clone(),
            detail: ResultDetail::Skipped,
            languages_applied: BTreeSet::new(),
            duration: Duration::ZERO,
        }
    }

    pub fn outcome(&self) -> Outcome {
        match self.detail {
            ResultDetail::Generated(_) => Outcome::Success,
            ResultDetail::Skipped => Outcome::Skipped,
            ResultDetail::Failed(_) => Outcome::Failed,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome() == Outcome::Success
    }

    pub fn error(&self) -> Option<&ErrorClass> {
        match &self.detail {
            ResultDetail::Failed(class) => Some(class),
            _ => None,
        }
    }

    pub fn payload(&self) -> Option<&[GeneratedContent]> {
        match &self.detail {
            ResultDetail::Generated(content) => Some(content),
            _ => None,
        }
    }
}

/// State machine of a generation job
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Preparing,
    Running,
    Completed,
    Aborted,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Preparing => "PREPARING",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Aborted => "ABORTED",
        };
        f.write_str(s)
    }
}

/// Which plan limit a selection violates
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "violation", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LimitViolation {
    #[serde(rename_all = "camelCase")]
    Languages {
        entity_id: String,
        projected: usize,
        limit: usize,
    },
    #[serde(rename_all = "camelCase")]
    Products { requested: usize, limit: usize },
}

impl fmt::Display for LimitViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Languages {
                entity_id,
                projected,
                limit,
            } => write!(
                f,
                "{entity_id} would have {projected} languages, plan allows {limit}"
            ),
            Self::Products { requested, limit } => write!(
                f,
                "{requested} products selected, plan allows {limit}"
            ),
        }
    }
}

/// Why a job stopped early
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "reason", content = "detail", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AbortReason {
    LimitExceeded(LimitViolation),
    Blocked(ErrorClass),
}

impl AbortReason {
    pub fn required_action(&self) -> RequiredAction {
        match self {
            Self::LimitExceeded(_) => RequiredAction::ReduceSelection,
            Self::Blocked(class) => class.required_action(),
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LimitExceeded(violation) => write!(f, "limit exceeded: {violation}"),
            Self::Blocked(class) => write!(f, "{class}"),
        }
    }
}

/// The single decision point surfaced for an aborted job
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobAbort {
    /// State the job was in when it stopped
    pub during: JobState,
    pub reason: AbortReason,
    /// Entity whose failure triggered the abort, if any
    pub entity_id: Option<String>,
}

/// How generated languages are paid for
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Billing {
    pub policy: TokenPolicy,
    pub tokens_per_language: u64,
    /// Whether this job debits the balance at all
    pub charged: bool,
}

impl Billing {
    pub fn new(policy: TokenPolicy, mode: OptimizationMode, tokens_per_language: u64) -> Self {
        Self {
            policy,
            tokens_per_language,
            charged: mode.is_ai() && policy.is_metered(),
        }
    }

    /// Tokens owed for `language_count` newly applied languages
    pub fn cost_for(&self, language_count: usize) -> u64 {
        if self.charged {
            self.tokens_per_language.saturating_mul(language_count as u64)
        } else {
            0
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub not_dispatched: usize,
}

/// Everything the generate phase produced
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationReport {
    pub job_id: Uuid,
    pub state: JobState,
    pub abort: Option<JobAbort>,
    /// Per-entity results in job order; never-dispatched entities are absent
    pub results: Vec<GenerationResult>,
    pub summary: JobSummary,
    pub mode: OptimizationMode,
    pub model: String,
    pub billing: Billing,
    /// Ledger as read before the job; generation never debits
    pub ledger: LedgerSnapshot,
    pub calls_issued: usize,
    pub windows_dispatched: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl GenerationReport {
    pub fn is_completed(&self) -> bool {
        self.state == JobState::Completed
    }

    /// Results eligible for the apply phase
    pub fn accepted(&self) -> impl Iterator<Item = &GenerationResult> {
        self.results.iter().filter(|r| r.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &GenerationResult> {
        self.results.iter().filter(|r| r.outcome() == Outcome::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_billing_only_charges_ai_on_metered() {
        let metered_ai = Billing::new(TokenPolicy::Metered, OptimizationMode::AiEnhanced, 3);
        assert_eq!(metered_ai.cost_for(2), 6);

        let metered_basic = Billing::new(TokenPolicy::Metered, OptimizationMode::Basic, 3);
        assert_eq!(metered_basic.cost_for(2), 0);

        let included_ai = Billing::new(TokenPolicy::Included, OptimizationMode::AiEnhanced, 3);
        assert_eq!(included_ai.cost_for(2), 0);
    }

    #[test]
    fn test_job_normalizes_languages_and_window() {
        let job = GenerationJob::new(Vec::new(), ["EN", "de", "en"]).with_window_size(0);
        assert_eq!(job.languages.len(), 2);
        assert_eq!(job.window_size, 1);
    }

    #[test]
    fn test_abort_reason_actions() {
        let limit = AbortReason::LimitExceeded(LimitViolation::Products {
            requested: 80,
            limit: 70,
        });
        assert_eq!(limit.required_action(), RequiredAction::ReduceSelection);
        assert_eq!(limit.to_string(), "limit exceeded: 80 products selected, plan allows 70");
    }
}
