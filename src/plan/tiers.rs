//! Static plan catalog
//!
//! Single source of truth for tier ordering and per-tier limits. Lookups never
//! fail: an unknown plan key resolves to the lowest tier.

use serde::Serialize;

/// How a tier pays for token-funded features
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenPolicy {
    /// Token-funded features are not offered
    None,
    /// Token-funded features debit the purchased balance
    Metered,
    /// Token-funded features are included in the subscription price
    Included,
}

impl TokenPolicy {
    pub fn is_metered(self) -> bool {
        matches!(self, Self::Metered)
    }
}

/// A subscription tier and its limits
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanTier {
    pub key: &'static str,
    pub name: &'static str,
    pub rank: u8,
    pub product_limit: usize,
    pub language_limit: usize,
    pub token_policy: TokenPolicy,
    pub price_usd: f64,
}

/// Tiers in ascending rank order
static PLANS: [PlanTier; 6] = [
    PlanTier {
        key: "starter",
        name: "Starter",
        rank: 1,
        product_limit: 70,
        language_limit: 1,
        token_policy: TokenPolicy::None,
        price_usd: 9.99,
    },
    PlanTier {
        key: "professional",
        name: "Professional",
        rank: 2,
        product_limit: 70,
        language_limit: 2,
        token_policy: TokenPolicy::Metered,
        price_usd: 15.99,
    },
    PlanTier {
        key: "professional_plus",
        name: "Professional Plus",
        rank: 3,
        product_limit: 70,
        language_limit: 2,
        token_policy: TokenPolicy::Included,
        price_usd: 19.99,
    },
    PlanTier {
        key: "growth",
        name: "Growth",
        rank: 4,
        product_limit: 450,
        language_limit: 3,
        token_policy: TokenPolicy::Metered,
        price_usd: 29.99,
    },
    PlanTier {
        key: "growth_plus",
        name: "Growth Plus",
        rank: 5,
        product_limit: 450,
        language_limit: 3,
        token_policy: TokenPolicy::Included,
        price_usd: 35.99,
    },
    PlanTier {
        key: "enterprise",
        name: "Enterprise",
        rank: 6,
        product_limit: 1500,
        language_limit: 6,
        token_policy: TokenPolicy::Included,
        price_usd: 79.99,
    },
];

/// Canonical form of a plan key: trimmed, lowercase, `-` and spaces as `_`
pub fn normalize_plan_key(plan_key: &str) -> String {
    plan_key
        .trim()
        .to_ascii_lowercase()
        .replace(['-', ' '], "_")
}

/// Look up a tier by key, if it exists
pub fn find(plan_key: &str) -> Option<&'static PlanTier> {
    let key = normalize_plan_key(plan_key);
    PLANS.iter().find(|p| p.key == key)
}

/// Limits for a plan key; unknown keys get the lowest tier
pub fn limits(plan_key: &str) -> &'static PlanTier {
    find(plan_key).unwrap_or(&PLANS[0])
}

/// Rank of a plan key for "at least" comparisons
pub fn rank(plan_key: &str) -> u8 {
    limits(plan_key).rank
}

/// All tiers, lowest rank first
pub fn all_plans() -> &'static [PlanTier] {
    &PLANS
}

/// The lowest tier
pub fn lowest() -> &'static PlanTier {
    &PLANS[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranks_are_strictly_increasing() {
        for pair in all_plans().windows(2) {
            assert!(pair[0].rank < pair[1].rank, "{} vs {}", pair[0].key, pair[1].key);
        }
    }

    #[test]
    fn test_unknown_key_falls_back_to_lowest() {
        assert_eq!(limits("platinum").key, "starter");
        assert_eq!(rank(""), 1);
        assert!(find("platinum").is_none());
    }

    #[test]
    fn test_key_normalization() {
        assert_eq!(limits(" Growth-Plus ").key, "growth_plus");
        assert_eq!(limits("professional plus").key, "professional_plus");
    }

    #[test]
    fn test_documented_limits() {
        let starter = limits("starter");
        assert_eq!(starter.language_limit, 1);
        assert_eq!(starter.token_policy, TokenPolicy::None);

        let growth = limits("growth");
        assert_eq!(growth.language_limit, 3);
        assert!(growth.token_policy.is_metered());
    }
}
