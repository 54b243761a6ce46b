//! Batch optimization
//!
//! - `orchestrator` - generate phase state machine
//! - `apply` - persistence, ledger debit and local merge
//! - `reconcile` - delayed reload after apply
//! - `classifier` - collaborator failure taxonomy
//! - `diff` - per-entity language delta
//! - `window` - fixed-size concurrent windows

pub mod apply;
pub mod classifier;
pub mod diff;
pub mod orchestrator;
pub mod progress;
pub mod reconcile;
pub mod types;
pub mod window;

pub use apply::{ApplyOutcome, ApplyPhase, ApplyReport, ApplyResult, ApplyStatus, DEFAULT_SETTLE_DELAY};
pub use classifier::{classify, CollaboratorFailure, ErrorClass, FailureFlags, RequiredAction};
pub use diff::{diff, LanguageDiff};
pub use orchestrator::{
    prepare_job, required_features, BatchOrchestrator, PreparedJob, WorkItem,
    DEFAULT_TOKENS_PER_LANGUAGE,
};
pub use progress::{Phase, ProgressReporter, ProgressUpdate};
pub use reconcile::{schedule_reload, ReloadHandle};
pub use types::{
    AbortReason, Billing, GenerationJob, GenerationReport, GenerationResult, JobAbort, JobState,
    JobSummary, LimitViolation, OptimizationMode, Outcome, ResultDetail, DEFAULT_MODEL,
};
pub use window::{plan_windows, settle_all, DEFAULT_WINDOW_SIZE};
