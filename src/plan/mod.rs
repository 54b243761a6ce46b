//! Subscription plans and entitlements
//!
//! - `tiers` - static plan catalog (limits, rank, token policy)
//! - `entitlement` - feature gating by rank and trial state

pub mod entitlement;
pub mod tiers;

pub use entitlement::{resolve, Access, Feature, SubscriptionState};
pub use tiers::{all_plans, limits, rank, PlanTier, TokenPolicy};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Trial block of the entitlement source payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrialInfo {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
}

/// Entitlement source payload, refreshed by the caller before each job
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementSnapshot {
    pub plan_key: String,
    #[serde(default)]
    pub language_limit: Option<usize>,
    #[serde(default)]
    pub product_limit: Option<usize>,
    #[serde(default)]
    pub trial: TrialInfo,
}

/// Effective entitlement for one job
///
/// Limits reported by the source win over the static catalog, which only
/// fills in what the source leaves out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entitlement {
    pub subscription: SubscriptionState,
    pub language_limit: usize,
    pub product_limit: usize,
}

impl Entitlement {
    /// Entitlement using the catalog limits of the plan
    pub fn from_subscription(subscription: SubscriptionState) -> Self {
        let tier = subscription.tier();
        Self {
            language_limit: tier.language_limit,
            product_limit: tier.product_limit,
            subscription,
        }
    }

    pub fn for_plan(plan_key: &str) -> Self {
        Self::from_subscription(SubscriptionState::new(plan_key))
    }

    pub fn tier(&self) -> &'static PlanTier {
        self.subscription.tier()
    }

    pub fn token_policy(&self) -> TokenPolicy {
        self.tier().token_policy
    }

    pub fn check(&self, feature: Feature, now: DateTime<Utc>) -> Access {
        resolve(&self.subscription, feature, now)
    }
}

impl From<EntitlementSnapshot> for Entitlement {
    fn from(snapshot: EntitlementSnapshot) -> Self {
        let subscription = SubscriptionState {
            plan_key: snapshot.plan_key,
            trial_active: snapshot.trial.active,
            trial_ends_at: snapshot.trial.ends_at,
        };
        let tier = subscription.tier();
        Self {
            language_limit: snapshot.language_limit.unwrap_or(tier.language_limit),
            product_limit: snapshot.product_limit.unwrap_or(tier.product_limit),
            subscription,
        }
    }
}
