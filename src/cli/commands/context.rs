//! Shared setup for commands that touch a catalog and an account

use crate::abstractions::{
    BalanceSource, CatalogSource, EntitlementSource, GenerationClient, HttpCollaborator,
    MockGenerationClient, MockPersistenceClient, PersistenceClient, StaticSources,
};
use crate::catalog::{normalize_languages, CatalogState, LanguageCode, OptimizableEntity};
use crate::cli::args::{AccountArgs, SelectionArgs};
use crate::config::CatalystConfig;
use crate::error::{CatalystError, ErrorCode, Result};
use crate::ledger::LedgerSnapshot;
use crate::plan::{Entitlement, EntitlementSnapshot, TrialInfo};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Entities and languages picked on the command line
pub struct Selection {
    pub state: CatalogState,
    pub entities: Vec<OptimizableEntity>,
    pub languages: BTreeSet<LanguageCode>,
}

impl Selection {
    pub fn load(args: &SelectionArgs) -> Result<Self> {
        let languages = normalize_languages(&args.languages);
        if languages.is_empty() {
            return Err(CatalystError::validation_with_code(
                ErrorCode::VALIDATION_EMPTY_SELECTION,
                "At least one target language is required",
                Some("languages".to_string()),
            ));
        }

        let state = CatalogState::load(&args.catalog)?;
        let entities = if args.ids.is_empty() {
            state.entities().cloned().collect()
        } else {
            state.select(&args.ids)
        };
        if entities.is_empty() {
            return Err(CatalystError::validation_with_code(
                ErrorCode::VALIDATION_EMPTY_SELECTION,
                "No entities selected",
                Some("ids".to_string()),
            ));
        }

        debug!(
            "Selected {} of {} entities",
            entities.len(),
            state.len()
        );
        Ok(Self {
            state,
            entities,
            languages,
        })
    }
}

/// Every collaborator a run needs
pub struct Collaborators {
    pub generator: Arc<dyn GenerationClient>,
    pub persistence: Arc<dyn PersistenceClient>,
    pub entitlement: Arc<dyn EntitlementSource>,
    pub balance: Arc<dyn BalanceSource>,
    /// Absent for dry runs, which skip the post-apply reload
    pub catalog: Option<Arc<dyn CatalogSource>>,
}

impl Collaborators {
    /// Backend collaborators; `--plan` replaces the billing endpoints
    pub fn connect(settings: &CatalystConfig, account: &AccountArgs) -> Result<Self> {
        let http = Arc::new(HttpCollaborator::from_config(settings)?);
        let (entitlement, balance): (Arc<dyn EntitlementSource>, Arc<dyn BalanceSource>) =
            match static_sources(account) {
                Some(sources) => {
                    let sources = Arc::new(sources);
                    (sources.clone() as Arc<dyn EntitlementSource>, sources as Arc<dyn BalanceSource>)
                }
                None => (
                    http.clone() as Arc<dyn EntitlementSource>,
                    http.clone() as Arc<dyn BalanceSource>,
                ),
            };

        Ok(Self {
            generator: http.clone(),
            persistence: http.clone(),
            entitlement,
            balance,
            catalog: Some(http),
        })
    }

    /// In-memory collaborators; requires `--plan`
    pub fn offline(account: &AccountArgs) -> Result<Self> {
        let sources = Arc::new(static_sources(account).ok_or_else(|| {
            CatalystError::validation_with_code(
                ErrorCode::VALIDATION_INVALID_INPUT,
                "--dry-run needs --plan",
                Some("plan".to_string()),
            )
        })?);

        Ok(Self {
            generator: Arc::new(MockGenerationClient::new()),
            persistence: Arc::new(MockPersistenceClient::new()),
            entitlement: sources.clone(),
            balance: sources,
            catalog: None,
        })
    }

    /// Fresh entitlement and balance, read before every job
    pub async fn account(&self) -> Result<(Entitlement, LedgerSnapshot)> {
        let snapshot = self.entitlement.fetch_entitlement().await?;
        let balance = self.balance.fetch_balance().await?;
        Ok((Entitlement::from(snapshot), balance))
    }
}

/// Billing sources for an explicit `--plan`, if one was given
pub fn static_sources(account: &AccountArgs) -> Option<StaticSources> {
    account.plan.as_ref().map(|plan| StaticSources {
        entitlement: EntitlementSnapshot {
            plan_key: plan.clone(),
            language_limit: None,
            product_limit: None,
            trial: TrialInfo {
                active: account.trial,
                ends_at: None,
            },
        },
        balance: LedgerSnapshot::with_balance(account.balance),
    })
}
