//! Read-only sources the caller consults before and after a job
//!
//! The core never polls these on its own; the caller refreshes entitlement and
//! balance before building a job, and the apply phase reads the catalog back
//! once for reconciliation.

use crate::catalog::OptimizableEntity;
use crate::error::Result;
use crate::ledger::LedgerSnapshot;
use crate::plan::EntitlementSnapshot;
use async_trait::async_trait;

#[async_trait]
pub trait EntitlementSource: Send + Sync {
    async fn fetch_entitlement(&self) -> Result<EntitlementSnapshot>;
}

#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn fetch_balance(&self) -> Result<LedgerSnapshot>;
}

#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch the current store copy of the given entities
    async fn fetch_entities(&self, ids: &[String]) -> Result<Vec<OptimizableEntity>>;
}
