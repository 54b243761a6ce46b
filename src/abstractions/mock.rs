//! In-memory collaborators for tests and dry runs

use super::generation::{GeneratedContent, GenerationClient, GenerationRequest, GenerationResponse};
use super::persistence::{PersistenceClient, PersistenceRequest, PersistenceResponse};
use super::sources::{BalanceSource, CatalogSource, EntitlementSource};
use crate::batch::CollaboratorFailure;
use crate::catalog::{LanguageCode, OptimizableEntity};
use crate::error::Result;
use crate::ledger::LedgerSnapshot;
use crate::plan::EntitlementSnapshot;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Tracks how many calls overlap
#[derive(Debug, Default)]
struct ConcurrencyGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyGauge {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Mock implementation of `GenerationClient`
///
/// Entities without a scripted response succeed with one content block per
/// requested language.
#[derive(Debug, Default)]
pub struct MockGenerationClient {
    scripted: Mutex<HashMap<String, std::result::Result<GenerationResponse, CollaboratorFailure>>>,
    delays: HashMap<String, Duration>,
    default_delay: Option<Duration>,
    calls: Mutex<Vec<GenerationRequest>>,
    gauge: ConcurrencyGauge,
}

impl MockGenerationClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call for `entity_id` with `failure`
    pub fn with_failure(self, entity_id: &str, failure: CollaboratorFailure) -> Self {
        locked(&self.scripted).insert(entity_id.to_string(), Err(failure));
        self
    }

    pub fn with_response(self, entity_id: &str, response: GenerationResponse) -> Self {
        locked(&self.scripted).insert(entity_id.to_string(), Ok(response));
        self
    }

    pub fn with_delay(mut self, entity_id: &str, delay: Duration) -> Self {
        self.delays.insert(entity_id.to_string(), delay);
        self
    }

    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<GenerationRequest> {
        locked(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        locked(&self.calls).len()
    }

    pub fn called_ids(&self) -> Vec<String> {
        locked(&self.calls)
            .iter()
            .map(|c| c.entity_id.clone())
            .collect()
    }

    /// Highest number of calls that were in flight at the same time
    pub fn max_concurrency(&self) -> usize {
        self.gauge.peak()
    }

    fn default_response(request: &GenerationRequest) -> GenerationResponse {
        GenerationResponse {
            results: request
                .languages
                .iter()
                .map(|language| GeneratedContent {
                    language: language.clone(),
                    data: serde_json::json!({
                        "title": format!("{} [{}]", request.entity_id, language),
                        "metaDescription": format!("Generated by {}", request.model),
                    }),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl GenerationClient for MockGenerationClient {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<GenerationResponse, CollaboratorFailure> {
        locked(&self.calls).push(request.clone());
        self.gauge.enter();

        let delay = self
            .delays
            .get(&request.entity_id)
            .copied()
            .or(self.default_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.gauge.exit();

        let scripted = locked(&self.scripted).get(&request.entity_id).cloned();
        scripted.unwrap_or_else(|| Ok(Self::default_response(&request)))
    }
}

/// Mock implementation of `PersistenceClient`
#[derive(Debug, Default)]
pub struct MockPersistenceClient {
    failures: HashMap<String, CollaboratorFailure>,
    rejections: HashMap<String, String>,
    confirmations: HashMap<String, Vec<LanguageCode>>,
    calls: Mutex<Vec<PersistenceRequest>>,
    gauge: ConcurrencyGauge,
    delay: Option<Duration>,
}

impl MockPersistenceClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The call itself fails (network, 5xx)
    pub fn with_failure(mut self, entity_id: &str, failure: CollaboratorFailure) -> Self {
        self.failures.insert(entity_id.to_string(), failure);
        self
    }

    /// The call succeeds but reports `ok: false`
    pub fn with_rejection(mut self, entity_id: &str, reason: &str) -> Self {
        self.rejections
            .insert(entity_id.to_string(), reason.to_string());
        self
    }

    /// The call succeeds but confirms only `languages`
    pub fn with_confirmation(mut self, entity_id: &str, languages: &[&str]) -> Self {
        self.confirmations.insert(
            entity_id.to_string(),
            languages.iter().map(|l| l.to_string()).collect(),
        );
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<PersistenceRequest> {
        locked(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        locked(&self.calls).len()
    }

    pub fn max_concurrency(&self) -> usize {
        self.gauge.peak()
    }
}

#[async_trait]
impl PersistenceClient for MockPersistenceClient {
    async fn persist(
        &self,
        request: PersistenceRequest,
    ) -> std::result::Result<PersistenceResponse, CollaboratorFailure> {
        locked(&self.calls).push(request.clone());
        self.gauge.enter();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.gauge.exit();

        if let Some(failure) = self.failures.get(&request.entity_id) {
            return Err(failure.clone());
        }
        if let Some(reason) = self.rejections.get(&request.entity_id) {
            return Ok(PersistenceResponse {
                ok: false,
                applied_languages: Vec::new(),
                error: Some(reason.clone()),
            });
        }

        let applied_languages = match self.confirmations.get(&request.entity_id) {
            Some(languages) => languages.clone(),
            None => request.results.iter().map(|r| r.language.clone()).collect(),
        };
        Ok(PersistenceResponse {
            ok: true,
            applied_languages,
            error: None,
        })
    }
}

/// Mock implementation of `CatalogSource` backed by a fixed entity set
#[derive(Debug, Default)]
pub struct MockCatalogSource {
    entities: Mutex<HashMap<String, OptimizableEntity>>,
    fetches: AtomicUsize,
}

impl MockCatalogSource {
    pub fn new(entities: impl IntoIterator<Item = OptimizableEntity>) -> Self {
        Self {
            entities: Mutex::new(entities.into_iter().map(|e| (e.id.clone(), e)).collect()),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Replace what the store will report for an entity
    pub fn set(&self, entity: OptimizableEntity) {
        locked(&self.entities).insert(entity.id.clone(), entity);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogSource for MockCatalogSource {
    async fn fetch_entities(&self, ids: &[String]) -> Result<Vec<OptimizableEntity>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let entities = locked(&self.entities);
        Ok(ids.iter().filter_map(|id| entities.get(id).cloned()).collect())
    }
}

/// Fixed entitlement and balance, for offline runs
#[derive(Debug, Clone)]
pub struct StaticSources {
    pub entitlement: EntitlementSnapshot,
    pub balance: LedgerSnapshot,
}

#[async_trait]
impl EntitlementSource for StaticSources {
    async fn fetch_entitlement(&self) -> Result<EntitlementSnapshot> {
        Ok(self.entitlement.clone())
    }
}

#[async_trait]
impl BalanceSource for StaticSources {
    async fn fetch_balance(&self) -> Result<LedgerSnapshot> {
        Ok(self.balance)
    }
}
