//! Delayed catalog reload after an apply
//!
//! The store settles asynchronously, so a reload issued right after persisting
//! can return stale optimization summaries. The reload runs on its own task
//! after a delay and is reconciled against the local state, which never
//! regresses.

use crate::abstractions::CatalogSource;
use crate::catalog::{CatalogState, OptimizableEntity, ReconcileSummary};
use crate::error::{CatalystError, ErrorCode, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Handle to a scheduled reload
#[derive(Debug)]
pub struct ReloadHandle {
    ids: Vec<String>,
    task: JoinHandle<Result<Vec<OptimizableEntity>>>,
}

/// Fetch `ids` from `source` once `delay` has elapsed
pub fn schedule_reload(
    source: Arc<dyn CatalogSource>,
    ids: Vec<String>,
    delay: Duration,
) -> ReloadHandle {
    let fetch_ids = ids.clone();
    let task = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        debug!("Reloading {} entities after {:?}", fetch_ids.len(), delay);
        source.fetch_entities(&fetch_ids).await
    });
    ReloadHandle { ids, task }
}

impl ReloadHandle {
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Wait for the reload and return the fetched entities
    pub async fn wait(self) -> Result<Vec<OptimizableEntity>> {
        match self.task.await {
            Ok(fetched) => fetched,
            Err(e) => Err(CatalystError::job(
                ErrorCode::JOB_RELOAD_FAILED,
                "catalog reload task did not finish",
                None,
            )
            .with_source(e)),
        }
    }

    /// Wait for the reload and fold it into `state`
    pub async fn reconcile_into(self, state: &mut CatalogState) -> Result<ReconcileSummary> {
        let fresh = self.wait().await?;
        let summary = state.reconcile(fresh);
        if summary.stale_kept > 0 {
            warn!(
                "{} reloaded entities were behind the local state and were ignored",
                summary.stale_kept
            );
        }
        Ok(summary)
    }

    pub fn abort(&self) {
        self.task.abort();
    }
}
