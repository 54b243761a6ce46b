//! Run command implementation
//!
//! Generate, report, and on `--apply` persist the accepted results and write
//! the merged catalog back to the file it came from.

use super::context::{Collaborators, Selection};
use crate::app::AppConfig;
use crate::batch::{
    ApplyOutcome, ApplyPhase, ApplyReport, ApplyStatus, BatchOrchestrator, GenerationJob,
    GenerationReport, Outcome, ProgressReporter, RequiredAction,
};
use crate::catalog::CatalogState;
use crate::cli::args::{AccountArgs, SelectionArgs};
use crate::cli::progress::spawn_renderer;
use crate::config::CatalystConfig;
use crate::error::{CatalystError, ErrorCode};
use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};

/// Parameters for the run command
pub struct RunParams {
    pub selection: SelectionArgs,
    pub account: AccountArgs,
    pub apply: bool,
    pub dry_run: bool,
    pub window_size: Option<usize>,
    pub json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunOutput<'a> {
    generation: &'a GenerationReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    apply: Option<&'a ApplyReport>,
}

/// What a run produced. An apply failure is kept next to the generation
/// report so the report is still printed.
struct RunResults {
    report: GenerationReport,
    apply: Option<crate::error::Result<ApplyOutcome>>,
}

/// Generate content for a selection, then optionally apply it
pub async fn run_optimize_command(app: &AppConfig, params: RunParams) -> Result<()> {
    let settings = app.load_settings().await?;
    let mode = params.selection.mode.into();
    let mut selection = Selection::load(&params.selection)?;
    let collaborators = if params.dry_run {
        Collaborators::offline(&params.account)?
    } else {
        Collaborators::connect(&settings, &params.account)?
    };
    let window_size = params.window_size.unwrap_or(settings.window_size);

    let job = GenerationJob::new(std::mem::take(&mut selection.entities), &selection.languages)
        .with_mode(mode)
        .with_model(settings.model.clone())
        .with_window_size(window_size);

    let (progress, updates) = ProgressReporter::channel();
    let renderer = spawn_renderer(updates, params.json);

    let run = execute(
        &collaborators,
        &settings,
        job,
        params.apply,
        &mut selection.state,
        progress,
    )
    .await;
    if renderer.await.is_err() {
        warn!("Progress renderer stopped unexpectedly");
    }
    let RunResults { report, apply } = run?;

    let (apply_report, reload, apply_error) = match apply {
        Some(Ok(outcome)) => (Some(outcome.report), outcome.reload, None),
        Some(Err(e)) => (None, None, Some(e)),
        None => (None, None, None),
    };

    if params.json {
        let output = RunOutput {
            generation: &report,
            apply: apply_report.as_ref(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_generation(&report);
        if let Some(apply) = &apply_report {
            print_apply(apply);
        } else if params.apply && !report.is_completed() {
            println!("⏭️  Apply skipped: job did not complete");
        }
    }

    if let Some(e) = apply_error {
        return Err(e.into());
    }

    if let Some(reload) = reload {
        info!("Waiting {:?} for the store to settle", settings.settle_delay);
        let summary = reload.reconcile_into(&mut selection.state).await?;
        selection.state.save()?;
        info!(
            "Reconciled catalog: {} refreshed, {} kept local, {} added",
            summary.refreshed, summary.stale_kept, summary.added
        );
    }

    match &report.abort {
        Some(abort) => Err(CatalystError::job(
            ErrorCode::JOB_ABORTED,
            format!("Job aborted: {}", abort.reason),
            Some(report.job_id.to_string()),
        )
        .into()),
        None => Ok(()),
    }
}

/// Generate, then apply a completed job when asked to
///
/// Only failures before generation starts are returned as `Err`; `progress`
/// is dropped on return so the renderer can finish.
async fn execute(
    collaborators: &Collaborators,
    settings: &CatalystConfig,
    job: GenerationJob,
    apply: bool,
    state: &mut CatalogState,
    progress: ProgressReporter,
) -> crate::error::Result<RunResults> {
    let (entitlement, ledger) = collaborators.account().await?;
    let window_size = job.window_size;

    let report = BatchOrchestrator::new(collaborators.generator.clone())
        .with_tokens_per_language(settings.tokens_per_language)
        .with_progress(progress.clone())
        .run(job, &entitlement, ledger)
        .await;

    let apply = if apply && report.is_completed() {
        Some(apply_results(collaborators, settings, window_size, &report, state, progress).await)
    } else {
        None
    };
    Ok(RunResults { report, apply })
}

async fn apply_results(
    collaborators: &Collaborators,
    settings: &CatalystConfig,
    window_size: usize,
    report: &GenerationReport,
    state: &mut CatalogState,
    progress: ProgressReporter,
) -> crate::error::Result<ApplyOutcome> {
    let mut phase = ApplyPhase::new(collaborators.persistence.clone())
        .with_window_size(window_size)
        .with_settle_delay(settings.settle_delay)
        .with_progress(progress);
    if let Some(source) = &collaborators.catalog {
        phase = phase.with_reload_source(source.clone());
    }

    // Balance may have moved while generating
    let ledger = collaborators.balance.fetch_balance().await?;
    let outcome = phase.run(report, ledger, state).await?;
    state.save()?;
    Ok(outcome)
}

/// Human wording for the single decision surfaced on abort
pub fn describe_action(action: &RequiredAction) -> String {
    match action {
        RequiredAction::UpgradePlan {
            required_plan: Some(plan),
        } => format!("upgrade to the {plan} plan"),
        RequiredAction::UpgradePlan {
            required_plan: None,
        } => "upgrade your plan".to_string(),
        RequiredAction::ActivatePlan => "activate your plan to end the trial".to_string(),
        RequiredAction::PurchaseTokens { needed } => format!("purchase {needed} more token(s)"),
        RequiredAction::ReduceSelection => "select fewer products or languages".to_string(),
        RequiredAction::None => "retry later".to_string(),
    }
}

fn print_generation(report: &GenerationReport) {
    let summary = &report.summary;
    println!("📦 Job {} {}", report.job_id, report.state);
    println!(
        "   {} succeeded, {} skipped, {} failed, {} not dispatched",
        summary.succeeded, summary.skipped, summary.failed, summary.not_dispatched
    );

    for result in report.results.iter().filter(|r| r.outcome() == Outcome::Failed) {
        if let Some(class) = result.error() {
            println!("   ✗ {}: {}", result.entity_id, class);
        }
    }

    if let Some(abort) = &report.abort {
        println!("❌ {}", abort.reason);
        println!("   Next step: {}", describe_action(&abort.reason.required_action()));
    }
}

fn print_apply(report: &ApplyReport) {
    println!(
        "💾 Applied {} result(s), {} failed, {} token(s) debited (balance {})",
        report.applied, report.failed, report.tokens_debited, report.ledger.balance
    );
    for result in &report.results {
        match &result.status {
            ApplyStatus::Applied => {}
            ApplyStatus::Failed { message } => {
                println!("   ✗ {}: {}", result.entity_id, message)
            }
            ApplyStatus::Unfunded {
                required,
                available,
            } => println!(
                "   ✗ {}: needs {} token(s), {} available",
                result.entity_id, required, available
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::context::static_sources;
    use super::*;
    use crate::abstractions::{BalanceSource, MockGenerationClient, MockPersistenceClient};
    use crate::catalog::{EntityKind, OptimizableEntity};
    use crate::ledger::LedgerSnapshot;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Balance endpoint that answers once, then goes away
    struct BalanceOutage {
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl BalanceSource for BalanceOutage {
        async fn fetch_balance(&self) -> crate::error::Result<LedgerSnapshot> {
            if self.fetches.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(LedgerSnapshot::with_balance(10))
            } else {
                Err(CatalystError::ledger(
                    ErrorCode::LEDGER_UNAVAILABLE,
                    "balance endpoint unreachable",
                ))
            }
        }
    }

    #[tokio::test]
    async fn test_apply_failure_keeps_generation_report() {
        let account = AccountArgs {
            plan: Some("growth".to_string()),
            balance: 10,
            trial: false,
        };
        let persistence = Arc::new(MockPersistenceClient::new());
        let collaborators = Collaborators {
            generator: Arc::new(MockGenerationClient::new()),
            persistence: persistence.clone(),
            entitlement: Arc::new(static_sources(&account).unwrap()),
            balance: Arc::new(BalanceOutage {
                fetches: AtomicUsize::new(0),
            }),
            catalog: None,
        };
        let entities = vec![OptimizableEntity::new("p1", "Lamp", EntityKind::Product)];
        let mut state = CatalogState::new(entities.clone());

        let run = execute(
            &collaborators,
            &CatalystConfig::default(),
            GenerationJob::new(entities, ["en"]),
            true,
            &mut state,
            ProgressReporter::disabled(),
        )
        .await
        .unwrap();

        assert!(run.report.is_completed());
        assert_eq!(run.report.summary.succeeded, 1);
        let err = run.apply.expect("apply attempted").unwrap_err();
        assert_eq!(err.code(), ErrorCode::LEDGER_UNAVAILABLE);
        assert_eq!(err.exit_code(), 4);
        assert_eq!(persistence.call_count(), 0);
        assert!(state
            .get("p1")
            .unwrap()
            .optimization
            .optimized_languages
            .is_empty());
    }

    #[test]
    fn test_describe_action() {
        assert_eq!(
            describe_action(&RequiredAction::UpgradePlan {
                required_plan: Some("growth".to_string())
            }),
            "upgrade to the growth plan"
        );
        assert_eq!(
            describe_action(&RequiredAction::PurchaseTokens { needed: 3 }),
            "purchase 3 more token(s)"
        );
    }
}
