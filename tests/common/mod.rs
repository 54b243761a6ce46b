//! Common test utilities and helpers

#![allow(dead_code)]

use catalyst::abstractions::MockGenerationClient;
use catalyst::batch::{BatchOrchestrator, GenerationJob, GenerationReport};
use catalyst::catalog::{EntityKind, OptimizableEntity};
use catalyst::ledger::LedgerSnapshot;
use catalyst::plan::Entitlement;
use std::sync::Arc;

/// Products `p1..=pN`
pub fn products(n: usize) -> Vec<OptimizableEntity> {
    (1..=n).map(product).collect()
}

pub fn product(i: usize) -> OptimizableEntity {
    OptimizableEntity::new(format!("p{i}"), format!("Product {i}"), EntityKind::Product)
}

pub fn collection(id: &str) -> OptimizableEntity {
    OptimizableEntity::new(id, format!("Collection {id}"), EntityKind::Collection)
}

/// Orchestrator over a shared mock so tests can inspect calls afterwards
pub fn orchestrator(generator: MockGenerationClient) -> (BatchOrchestrator, Arc<MockGenerationClient>) {
    let generator = Arc::new(generator);
    (BatchOrchestrator::new(generator.clone()), generator)
}

pub async fn generate(
    generator: MockGenerationClient,
    job: GenerationJob,
    plan: &str,
    ledger: LedgerSnapshot,
) -> (GenerationReport, Arc<MockGenerationClient>) {
    let (orchestrator, generator) = orchestrator(generator);
    let report = orchestrator
        .run(job, &Entitlement::for_plan(plan), ledger)
        .await;
    (report, generator)
}
