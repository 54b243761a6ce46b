//! Per-entity language delta
//!
//! Only languages an entity does not already have are generated. An entity
//! with nothing new is skipped without a call, which is what makes re-running
//! a job over covered languages free.

use crate::catalog::{LanguageCode, OptimizableEntity};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LanguageDiff {
    pub new_languages: BTreeSet<LanguageCode>,
    /// Size of `optimized ∪ requested`
    pub projected_total: usize,
    pub limit_exceeded: bool,
}

impl LanguageDiff {
    pub fn is_skip(&self) -> bool {
        self.new_languages.is_empty()
    }
}

/// Compute the delta for one entity.
///
/// The limit is only enforced when there is new work: an entity that already
/// exceeds a (since lowered) limit is still skipped cleanly on a re-run.
pub fn diff(
    entity: &OptimizableEntity,
    requested: &BTreeSet<LanguageCode>,
    language_limit: usize,
) -> LanguageDiff {
    let optimized = &entity.optimization.optimized_languages;
    let new_languages: BTreeSet<LanguageCode> = requested.difference(optimized).cloned().collect();
    let projected_total = optimized.union(requested).count();

    LanguageDiff {
        limit_exceeded: !new_languages.is_empty() && projected_total > language_limit,
        new_languages,
        projected_total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{normalize_languages, EntityKind};
    use proptest::prelude::*;

    fn entity(optimized: &[&str]) -> OptimizableEntity {
        OptimizableEntity::new("p1", "Lamp", EntityKind::Product).with_optimized(optimized)
    }

    #[test]
    fn test_new_languages_exclude_covered_ones() {
        let d = diff(&entity(&["en"]), &normalize_languages(["en", "de"]), 3);
        assert_eq!(d.new_languages, normalize_languages(["de"]));
        assert_eq!(d.projected_total, 2);
        assert!(!d.limit_exceeded);
        assert!(!d.is_skip());
    }

    #[test]
    fn test_fully_covered_entity_is_skipped() {
        let d = diff(&entity(&["en", "de"]), &normalize_languages(["de"]), 2);
        assert!(d.is_skip());
        assert!(!d.limit_exceeded);
    }

    #[test]
    fn test_limit_exceeded_when_projection_is_too_large() {
        // Already at a limit of 2, asking for one more
        let d = diff(&entity(&["en", "de"]), &normalize_languages(["fr"]), 2);
        assert_eq!(d.projected_total, 3);
        assert!(d.limit_exceeded);

        // Starter plan: two languages on a fresh entity
        let d = diff(&entity(&[]), &normalize_languages(["en", "de"]), 1);
        assert!(d.limit_exceeded);
    }

    #[test]
    fn test_over_limit_entity_without_new_work_is_not_flagged() {
        let d = diff(&entity(&["en", "de", "fr"]), &normalize_languages(["en"]), 1);
        assert!(d.is_skip());
        assert!(!d.limit_exceeded);
    }

    proptest! {
        #[test]
        fn prop_diff_partitions_requested(
            optimized in prop::collection::btree_set("[a-f]{2}", 0..5),
            requested in prop::collection::btree_set("[a-f]{2}", 0..5),
            limit in 0usize..8,
        ) {
            let mut e = entity(&[]);
            e.optimization.optimized_languages = optimized.clone();
            let d = diff(&e, &requested, limit);

            for lang in &d.new_languages {
                prop_assert!(requested.contains(lang));
                prop_assert!(!optimized.contains(lang));
            }
            prop_assert_eq!(d.projected_total, optimized.len() + d.new_languages.len());
            prop_assert!(d.projected_total >= optimized.len());
        }
    }
}
