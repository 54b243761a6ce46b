//! Preflight command implementation
//!
//! Runs the preparing state only: no generation request is made.

use super::context::{static_sources, Selection};
use super::run::describe_action;
use crate::abstractions::{BalanceSource, EntitlementSource, HttpCollaborator};
use crate::app::AppConfig;
use crate::batch::{prepare_job, GenerationJob, JobAbort, RequiredAction};
use crate::catalog::LanguageCode;
use crate::cli::args::{AccountArgs, SelectionArgs};
use crate::error::{CatalystError, ErrorCode};
use crate::plan::Entitlement;
use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PendingWork {
    entity_id: String,
    new_languages: BTreeSet<LanguageCode>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PreflightReport {
    plan: String,
    ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    abort: Option<JobAbort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    required_action: Option<RequiredAction>,
    to_generate: Vec<PendingWork>,
    skipped: Vec<String>,
    total_cost: u64,
    balance: u64,
}

/// Check a selection against plan limits and balance
pub async fn run_preflight_command(
    app: &AppConfig,
    selection: SelectionArgs,
    account: AccountArgs,
    json: bool,
) -> Result<()> {
    let settings = app.load_settings().await?;
    let mode = selection.mode.into();
    let selection = Selection::load(&selection)?;

    let (entitlement, ledger) = match static_sources(&account) {
        Some(sources) => (Entitlement::from(sources.entitlement), sources.balance),
        None => {
            let http = HttpCollaborator::from_config(&settings)?;
            (
                Entitlement::from(http.fetch_entitlement().await?),
                http.fetch_balance().await?,
            )
        }
    };

    let job = GenerationJob::new(selection.entities, &selection.languages)
        .with_mode(mode)
        .with_model(settings.model.clone());

    let mut report = PreflightReport {
        plan: entitlement.tier().key.to_string(),
        ready: false,
        abort: None,
        required_action: None,
        to_generate: Vec::new(),
        skipped: Vec::new(),
        total_cost: 0,
        balance: ledger.balance,
    };

    match prepare_job(&job, &entitlement, &ledger, settings.tokens_per_language, Utc::now()) {
        Ok(prepared) => {
            report.ready = true;
            report.total_cost = prepared.total_cost;
            report.skipped = prepared
                .skipped
                .iter()
                .map(|&i| job.entities[i].id.clone())
                .collect();
            report.to_generate = prepared
                .work
                .into_iter()
                .map(|w| PendingWork {
                    entity_id: w.entity.id,
                    new_languages: w.new_languages,
                })
                .collect();
        }
        Err(abort) => {
            report.required_action = Some(abort.reason.required_action());
            report.abort = Some(abort);
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    match report.abort {
        Some(abort) => Err(CatalystError::job(
            ErrorCode::JOB_ABORTED,
            format!("Selection would be rejected: {}", abort.reason),
            None,
        )
        .into()),
        None => Ok(()),
    }
}

fn print_report(report: &PreflightReport) {
    println!("🔎 Preflight on plan {}", report.plan);
    for work in &report.to_generate {
        let languages: Vec<&str> = work.new_languages.iter().map(String::as_str).collect();
        println!("   {} → {}", work.entity_id, languages.join(", "));
    }
    if !report.skipped.is_empty() {
        println!("   Already covered: {}", report.skipped.join(", "));
    }

    match (&report.abort, &report.required_action) {
        (Some(abort), Some(action)) => {
            println!("❌ {}", abort.reason);
            println!("   Next step: {}", describe_action(action));
        }
        _ => println!(
            "✅ Ready: {} to generate, {} token(s) of {} available",
            report.to_generate.len(),
            report.total_cost,
            report.balance
        ),
    }
}
