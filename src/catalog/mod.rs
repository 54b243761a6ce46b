//! Catalog entities targeted for optimization
//!
//! Entities are created by an external sync step. Inside this crate they are
//! only ever mutated by the apply phase, which adds languages, sets the
//! AI-enhanced flag and stamps the optimization time.

pub mod state;

pub use state::{CatalogState, ReconcileSummary};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Language code such as `en` or `pt-br`, always stored lowercase
pub type LanguageCode = String;

/// Normalize a language code for set comparisons
pub fn normalize_language(code: &str) -> LanguageCode {
    code.trim().to_ascii_lowercase().replace('_', "-")
}

/// Normalize a collection of language codes, dropping empty entries
pub fn normalize_languages<I, S>(codes: I) -> BTreeSet<LanguageCode>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    codes
        .into_iter()
        .map(|c| normalize_language(c.as_ref()))
        .filter(|c| !c.is_empty())
        .collect()
}

/// Kind of catalog entity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Product,
    Collection,
}

/// Publication status of an entity in the store
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityStatus {
    #[default]
    Active,
    Draft,
    Archived,
}

/// What has already been optimized for an entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationSummary {
    #[serde(default)]
    pub optimized_languages: BTreeSet<LanguageCode>,
    #[serde(default)]
    pub ai_enhanced: bool,
    #[serde(default)]
    pub last_optimized_at: Option<DateTime<Utc>>,
}

/// A product or collection that can be optimized
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OptimizableEntity {
    pub id: String,
    pub title: String,
    pub kind: EntityKind,
    #[serde(default)]
    pub status: EntityStatus,
    #[serde(default, alias = "optimizationSummary")]
    pub optimization: OptimizationSummary,
}

impl OptimizableEntity {
    pub fn new(id: impl Into<String>, title: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            kind,
            status: EntityStatus::Active,
            optimization: OptimizationSummary::default(),
        }
    }

    /// Builder-style helper to seed already optimized languages
    pub fn with_optimized<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.optimization.optimized_languages = normalize_languages(languages);
        self
    }

    pub fn with_status(mut self, status: EntityStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_product(&self) -> bool {
        self.kind == EntityKind::Product
    }

    /// Monotone merge of newly applied languages into the summary
    pub fn record_applied(
        &mut self,
        languages: &BTreeSet<LanguageCode>,
        ai_enhanced: bool,
        at: DateTime<Utc>,
    ) {
        self.optimization
            .optimized_languages
            .extend(languages.iter().cloned());
        self.optimization.ai_enhanced |= ai_enhanced;
        self.optimization.last_optimized_at = Some(at);
    }
}
