//! Feature entitlement resolution
//!
//! Two gates apply to every feature. The plan rank must reach the feature's
//! minimum tier, and a running trial withholds token-funded features on tiers
//! that include tokens until the plan is activated.

use super::tiers::{self, PlanTier, TokenPolicy};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Gated capabilities of the optimizer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Feature {
    ProductOptimization,
    CollectionOptimization,
    AiEnhancement,
    BulkAiEnhancement,
}

impl Feature {
    /// Cheapest plan key that unlocks this feature
    pub fn minimum_plan(self) -> &'static str {
        match self {
            Self::ProductOptimization => "starter",
            Self::CollectionOptimization => "professional",
            Self::AiEnhancement => "professional",
            Self::BulkAiEnhancement => "growth",
        }
    }

    pub fn minimum_rank(self) -> u8 {
        tiers::rank(self.minimum_plan())
    }

    /// Features paid for with tokens
    pub fn is_token_funded(self) -> bool {
        matches!(self, Self::AiEnhancement | Self::BulkAiEnhancement)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ProductOptimization => "product optimization",
            Self::CollectionOptimization => "collection optimization",
            Self::AiEnhancement => "AI enhancement",
            Self::BulkAiEnhancement => "bulk AI enhancement",
        };
        f.write_str(label)
    }
}

/// Subscription as reported by the entitlement source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionState {
    pub plan_key: String,
    #[serde(default)]
    pub trial_active: bool,
    #[serde(default)]
    pub trial_ends_at: Option<DateTime<Utc>>,
}

impl SubscriptionState {
    pub fn new(plan_key: impl Into<String>) -> Self {
        Self {
            plan_key: plan_key.into(),
            trial_active: false,
            trial_ends_at: None,
        }
    }

    pub fn with_trial(mut self, ends_at: Option<DateTime<Utc>>) -> Self {
        self.trial_active = true;
        self.trial_ends_at = ends_at;
        self
    }

    /// A trial whose end date has passed no longer counts
    pub fn trial_in_effect(&self, now: DateTime<Utc>) -> bool {
        self.trial_active && self.trial_ends_at.map_or(true, |ends| ends > now)
    }

    pub fn tier(&self) -> &'static PlanTier {
        tiers::limits(&self.plan_key)
    }
}

/// Result of an entitlement check
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "access", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Access {
    Enabled,
    #[serde(rename_all = "camelCase")]
    Locked {
        required_plan: String,
        requires_activation: bool,
    },
}

impl Access {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled)
    }
}

/// Resolve access to a feature for a subscription at a point in time
pub fn resolve(subscription: &SubscriptionState, feature: Feature, now: DateTime<Utc>) -> Access {
    let tier = subscription.tier();

    if tier.rank < feature.minimum_rank() {
        return Access::Locked {
            required_plan: feature.minimum_plan().to_string(),
            requires_activation: false,
        };
    }

    if feature.is_token_funded()
        && tier.token_policy == TokenPolicy::Included
        && subscription.trial_in_effect(now)
    {
        return Access::Locked {
            required_plan: tier.key.to_string(),
            requires_activation: true,
        };
    }

    Access::Enabled
}
