mod common;

use catalyst::abstractions::MockGenerationClient;
use catalyst::batch::{
    AbortReason, BatchOrchestrator, CollaboratorFailure, ErrorClass, GenerationJob, JobState,
    LimitViolation, OptimizationMode, Outcome, RequiredAction,
};
use catalyst::ledger::LedgerSnapshot;
use catalyst::plan::{Entitlement, EntitlementSnapshot, SubscriptionState, TrialInfo};
use chrono::{Duration as ChronoDuration, Utc};
use common::{collection, generate, orchestrator, products};
use std::time::Duration;

#[tokio::test]
async fn test_rerun_over_covered_languages_issues_no_calls() {
    let entities: Vec<_> = products(6)
        .into_iter()
        .map(|e| e.with_optimized(["en", "de"]))
        .collect();
    let job = GenerationJob::new(entities, ["de", "EN"]).with_mode(OptimizationMode::AiEnhanced);

    let (report, generator) = generate(
        MockGenerationClient::new(),
        job,
        "growth",
        LedgerSnapshot::with_balance(0),
    )
    .await;

    assert_eq!(report.state, JobState::Completed);
    assert_eq!(generator.call_count(), 0);
    assert_eq!(report.windows_dispatched, 0);
    assert_eq!(report.summary.skipped, 6);
    assert!(report.results.iter().all(|r| r.outcome() == Outcome::Skipped));
    assert_eq!(report.ledger, LedgerSnapshot::with_balance(0));
}

#[tokio::test]
async fn test_language_limit_aborts_before_any_call() {
    // Professional allows two languages; the entity already has both
    let entities = vec![common::product(1).with_optimized(["en", "fr"]), common::product(2)];
    let job = GenerationJob::new(entities, ["de"]);

    let (report, generator) = generate(
        MockGenerationClient::new(),
        job,
        "professional",
        LedgerSnapshot::default(),
    )
    .await;

    assert_eq!(report.state, JobState::Aborted);
    assert_eq!(generator.call_count(), 0);
    let abort = report.abort.expect("abort recorded");
    assert_eq!(abort.during, JobState::Preparing);
    assert_eq!(
        abort.reason,
        AbortReason::LimitExceeded(LimitViolation::Languages {
            entity_id: "p1".to_string(),
            projected: 3,
            limit: 2,
        })
    );
    assert_eq!(abort.reason.required_action(), RequiredAction::ReduceSelection);
    assert_eq!(report.summary.not_dispatched, 2);
}

#[tokio::test]
async fn test_limit_abort_serializes_to_json() {
    let entities = vec![common::product(1).with_optimized(["en", "fr"])];
    let (report, _) = generate(
        MockGenerationClient::new(),
        GenerationJob::new(entities, ["de"]),
        "professional",
        LedgerSnapshot::default(),
    )
    .await;

    let json = serde_json::to_value(&report).expect("report serializes");
    assert_eq!(json["state"], "ABORTED");
    assert_eq!(json["abort"]["during"], "PREPARING");
    let reason = &json["abort"]["reason"];
    assert_eq!(reason["reason"], "LIMIT_EXCEEDED");
    assert_eq!(reason["detail"]["violation"], "LANGUAGES");
    assert_eq!(reason["detail"]["entityId"], "p1");
    assert_eq!(reason["detail"]["projected"], 3);
    assert_eq!(reason["detail"]["limit"], 2);
}

#[tokio::test]
async fn test_starter_two_languages_on_fresh_entity() {
    let (report, generator) = generate(
        MockGenerationClient::new(),
        GenerationJob::new(products(1), ["en", "de"]),
        "starter",
        LedgerSnapshot::default(),
    )
    .await;

    assert_eq!(generator.call_count(), 0);
    assert!(matches!(
        report.abort.map(|a| a.reason),
        Some(AbortReason::LimitExceeded(LimitViolation::Languages {
            projected: 2,
            limit: 1,
            ..
        }))
    ));
}

#[tokio::test]
async fn test_plan_restriction_stops_at_window_boundary() {
    let generator = MockGenerationClient::new()
        .with_failure("p3", CollaboratorFailure::plan_restricted("enterprise"));
    let job = GenerationJob::new(products(10), ["en"]).with_window_size(5);

    let (report, generator) = generate(generator, job, "growth", LedgerSnapshot::default()).await;

    assert_eq!(report.state, JobState::Aborted);
    assert_eq!(report.windows_dispatched, 1);

    let mut called = generator.called_ids();
    called.sort();
    assert_eq!(called, vec!["p1", "p2", "p3", "p4", "p5"]);

    let abort = report.abort.expect("abort recorded");
    assert_eq!(abort.during, JobState::Running);
    assert_eq!(abort.entity_id.as_deref(), Some("p3"));
    assert_eq!(
        abort.reason.required_action(),
        RequiredAction::UpgradePlan {
            required_plan: Some("enterprise".to_string())
        }
    );

    // Observed outcomes of the aborting window are kept, in job order
    let ids: Vec<_> = report.results.iter().map(|r| r.entity_id.as_str()).collect();
    assert_eq!(ids, vec!["p1", "p2", "p3", "p4", "p5"]);
    assert_eq!(report.summary.not_dispatched, 5);
}

#[tokio::test]
async fn test_insufficient_tokens_from_generation_aborts() {
    let mut generator = MockGenerationClient::new();
    for entity in products(8) {
        generator = generator.with_failure(&entity.id, CollaboratorFailure::insufficient_tokens(50, 10));
    }
    let job = GenerationJob::new(products(8), ["en"]);

    let (report, generator) = generate(generator, job, "growth", LedgerSnapshot::default()).await;

    assert_eq!(report.state, JobState::Aborted);
    assert_eq!(generator.call_count(), 5);
    assert_eq!(report.summary.succeeded, 0);
    assert_eq!(report.summary.not_dispatched, 3);
    assert_eq!(
        report.abort.map(|a| a.reason),
        Some(AbortReason::Blocked(ErrorClass::InsufficientTokens {
            required: 50,
            available: 10,
            needed: 40,
        }))
    );
}

#[tokio::test]
async fn test_insufficient_tokens_with_single_slot_window() {
    let generator = MockGenerationClient::new()
        .with_failure("p1", CollaboratorFailure::insufficient_tokens(50, 10));
    let job = GenerationJob::new(products(8), ["en"]).with_window_size(1);

    let (report, generator) = generate(generator, job, "growth", LedgerSnapshot::default()).await;

    assert_eq!(generator.called_ids(), vec!["p1"]);
    assert_eq!(report.summary.succeeded, 0);
    assert_eq!(report.summary.not_dispatched, 7);
}

#[tokio::test(start_paused = true)]
async fn test_earliest_job_wide_failure_in_window_wins() {
    // p2 settles last but comes first in job order
    let generator = MockGenerationClient::new()
        .with_failure("p2", CollaboratorFailure::plan_restricted("enterprise"))
        .with_delay("p2", Duration::from_millis(200))
        .with_failure("p4", CollaboratorFailure::trial_restricted(true));
    let job = GenerationJob::new(products(6), ["en"]).with_window_size(5);

    let (report, _) = generate(generator, job, "growth", LedgerSnapshot::default()).await;

    let abort = report.abort.expect("abort recorded");
    assert_eq!(abort.entity_id.as_deref(), Some("p2"));
    assert!(matches!(abort.reason, AbortReason::Blocked(ErrorClass::PlanRestriction { .. })));
}

#[tokio::test]
async fn test_generic_failures_accumulate() {
    let generator = MockGenerationClient::new()
        .with_failure("p2", CollaboratorFailure::transport("connection reset"))
        .with_failure("p7", CollaboratorFailure::from_response(502, "bad gateway"));
    let job = GenerationJob::new(products(9), ["en"]).with_window_size(4);

    let (report, generator) = generate(generator, job, "growth", LedgerSnapshot::default()).await;

    assert_eq!(report.state, JobState::Completed);
    assert_eq!(generator.call_count(), 9);
    assert_eq!(report.summary.failed, 2);
    assert_eq!(report.summary.succeeded, 7);
    let failed: Vec<_> = report.failures().map(|r| r.entity_id.as_str()).collect();
    assert_eq!(failed, vec!["p2", "p7"]);
    assert!(report
        .failures()
        .all(|r| matches!(r.error(), Some(ErrorClass::Generic { .. }))));
}

#[tokio::test(start_paused = true)]
async fn test_window_bounds_concurrency() {
    let generator = MockGenerationClient::new().with_default_delay(Duration::from_millis(50));
    let job = GenerationJob::new(products(12), ["en"]).with_window_size(4);

    let (report, generator) = generate(generator, job, "growth", LedgerSnapshot::default()).await;

    assert_eq!(report.windows_dispatched, 3);
    assert_eq!(generator.max_concurrency(), 4);
    assert_eq!(report.calls_issued, 12);
}

#[tokio::test]
async fn test_trial_gate_on_included_plan() {
    let trial = Entitlement::from_subscription(SubscriptionState::new("growth_plus").with_trial(None));
    let job = || {
        GenerationJob::new(products(2), ["en"]).with_mode(OptimizationMode::AiEnhanced)
    };

    let (orchestrator, generator) = orchestrator(MockGenerationClient::new());
    let report = orchestrator.run(job(), &trial, LedgerSnapshot::default()).await;
    assert_eq!(report.state, JobState::Aborted);
    assert_eq!(generator.call_count(), 0);
    assert_eq!(
        report.abort.map(|a| a.reason.required_action()),
        Some(RequiredAction::ActivatePlan)
    );

    // An expired trial no longer gates
    let expired = Entitlement::from_subscription(
        SubscriptionState::new("growth_plus").with_trial(Some(Utc::now() - ChronoDuration::days(1))),
    );
    let report = orchestrator.run(job(), &expired, LedgerSnapshot::default()).await;
    assert_eq!(report.state, JobState::Completed);

    // Metered plans pay per use, so a trial does not gate them
    let metered = Entitlement::from_subscription(SubscriptionState::new("growth").with_trial(None));
    let report = orchestrator
        .run(job(), &metered, LedgerSnapshot::with_balance(2))
        .await;
    assert_eq!(report.state, JobState::Completed);
}

#[tokio::test]
async fn test_collections_need_professional() {
    let job = || GenerationJob::new(vec![collection("c1")], ["en"]);

    let (report, generator) = generate(
        MockGenerationClient::new(),
        job(),
        "starter",
        LedgerSnapshot::default(),
    )
    .await;
    assert_eq!(generator.call_count(), 0);
    assert_eq!(
        report.abort.map(|a| a.reason.required_action()),
        Some(RequiredAction::UpgradePlan {
            required_plan: Some("professional".to_string())
        })
    );

    let (report, _) = generate(
        MockGenerationClient::new(),
        job(),
        "professional",
        LedgerSnapshot::default(),
    )
    .await;
    assert_eq!(report.state, JobState::Completed);
}

#[tokio::test]
async fn test_snapshot_product_limit_applies() {
    let entitlement = Entitlement::from(EntitlementSnapshot {
        plan_key: "growth".to_string(),
        language_limit: None,
        product_limit: Some(3),
        trial: TrialInfo::default(),
    });
    let (orchestrator, generator) = orchestrator(MockGenerationClient::new());

    let report = orchestrator
        .run(GenerationJob::new(products(4), ["en"]), &entitlement, LedgerSnapshot::default())
        .await;

    assert_eq!(generator.call_count(), 0);
    assert_eq!(
        report.abort.map(|a| a.reason),
        Some(AbortReason::LimitExceeded(LimitViolation::Products {
            requested: 4,
            limit: 3
        }))
    );
}

#[tokio::test]
async fn test_metered_ai_job_checks_balance_but_never_debits() {
    let job = GenerationJob::new(products(3), ["en", "de"]).with_mode(OptimizationMode::AiEnhanced);
    let orchestrator = BatchOrchestrator::new(std::sync::Arc::new(MockGenerationClient::new()))
        .with_tokens_per_language(2);

    let short = orchestrator
        .run(job.clone(), &Entitlement::for_plan("growth"), LedgerSnapshot::with_balance(11))
        .await;
    assert_eq!(
        short.abort.map(|a| a.reason.required_action()),
        Some(RequiredAction::PurchaseTokens { needed: 1 })
    );

    let funded = orchestrator
        .run(job, &Entitlement::for_plan("growth"), LedgerSnapshot::with_balance(12))
        .await;
    assert_eq!(funded.state, JobState::Completed);
    assert_eq!(funded.ledger.balance, 12);
    assert!(funded.billing.charged);
}
