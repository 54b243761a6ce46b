//! Local catalog state with JSON/YAML file persistence
//!
//! The state is the caller's optimistic view of the catalog. The apply phase
//! merges confirmed results into it right away, and a later confirmatory reload
//! reconciles it against the store once downstream caches have settled.

use super::{LanguageCode, OptimizableEntity};
use crate::error::{CatalystError, ErrorCode, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Serialized file layout
#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    entities: Vec<OptimizableEntity>,
}

/// Outcome of reconciling local state with a fresh read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Entities replaced by the fresh copy
    pub refreshed: usize,
    /// Entities kept because the fresh copy predates the local merge
    pub stale_kept: usize,
    /// Entities returned by the source that were not tracked locally
    pub added: usize,
}

/// In-memory catalog keyed by entity id, in stable id order
#[derive(Debug, Default)]
pub struct CatalogState {
    entities: BTreeMap<String, OptimizableEntity>,
    path: Option<PathBuf>,
}

impl CatalogState {
    pub fn new(entities: impl IntoIterator<Item = OptimizableEntity>) -> Self {
        Self {
            entities: entities.into_iter().map(|e| (e.id.clone(), e)).collect(),
            path: None,
        }
    }

    /// Load a catalog file; `.yaml`/`.yml` are read as YAML, anything else as JSON
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CatalystError::from(e).with_context(format!("reading {}", path.display()))
        })?;

        let file: CatalogFile = if is_yaml(path) {
            serde_yaml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };

        debug!(
            "Loaded {} entities from {}",
            file.entities.len(),
            path.display()
        );

        let mut state = Self::new(file.entities);
        state.path = Some(path.to_path_buf());
        Ok(state)
    }

    /// Persist back to the file this state was loaded from
    pub fn save(&self) -> Result<()> {
        let path = self.path.as_ref().ok_or_else(|| {
            CatalystError::catalog(
                ErrorCode::CATALOG_GENERIC,
                "Catalog state has no backing file",
                None,
            )
        })?;
        self.save_to(path)
    }

    /// Write atomically via a temp file and rename
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = CatalogFile {
            entities: self.entities.values().cloned().collect(),
        };
        let content = if is_yaml(path) {
            serde_yaml::to_string(&file)?
        } else {
            serde_json::to_string_pretty(&file)?
        };

        let temp = path.with_extension("tmp");
        fs::write(&temp, content).map_err(|e| {
            CatalystError::catalog(
                ErrorCode::CATALOG_IO_ERROR,
                "Failed to write catalog",
                Some(temp.clone()),
            )
            .with_source(e)
        })?;
        fs::rename(&temp, path).map_err(|e| {
            CatalystError::catalog(
                ErrorCode::CATALOG_IO_ERROR,
                "Failed to replace catalog",
                Some(path.to_path_buf()),
            )
            .with_source(e)
        })?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&OptimizableEntity> {
        self.entities.get(id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entities(&self) -> impl Iterator<Item = &OptimizableEntity> {
        self.entities.values()
    }

    /// Select entities by id, preserving the order of `ids`; unknown ids are skipped
    pub fn select(&self, ids: &[String]) -> Vec<OptimizableEntity> {
        ids.iter()
            .filter_map(|id| {
                let found = self.entities.get(id).cloned();
                if found.is_none() {
                    warn!("Entity {} is not in the local catalog", id);
                }
                found
            })
            .collect()
    }

    /// Optimistic local merge of an applied entity.
    ///
    /// Returns false when the entity is not tracked locally.
    pub fn merge_applied(
        &mut self,
        entity_id: &str,
        languages: &BTreeSet<LanguageCode>,
        ai_enhanced: bool,
        at: DateTime<Utc>,
    ) -> bool {
        match self.entities.get_mut(entity_id) {
            Some(entity) => {
                entity.record_applied(languages, ai_enhanced, at);
                true
            }
            None => false,
        }
    }

    /// Reconcile with a fresh read from the store.
    ///
    /// A fresh copy that is missing a language or the AI flag the local copy
    /// already records is a stale read from a cache that has not caught up
    /// yet; the local copy is kept. Timestamps are not compared since the
    /// store stamps its own clock.
    pub fn reconcile(&mut self, fresh: Vec<OptimizableEntity>) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();

        for incoming in fresh {
            match self.entities.get_mut(&incoming.id) {
                Some(local) => {
                    let known = &local.optimization;
                    let seen = &incoming.optimization;
                    let stale = !known.optimized_languages.is_subset(&seen.optimized_languages)
                        || (known.ai_enhanced && !seen.ai_enhanced);

                    if stale {
                        debug!("Keeping local copy of {}: fresh read is stale", incoming.id);
                        summary.stale_kept += 1;
                    } else {
                        *local = incoming;
                        summary.refreshed += 1;
                    }
                }
                None => {
                    self.entities.insert(incoming.id.clone(), incoming);
                    summary.added += 1;
                }
            }
        }

        summary
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}
