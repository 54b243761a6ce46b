//! Failure classification
//!
//! Collaborators report failures as an HTTP status plus a handful of flags.
//! `classify` folds them into the fixed `ErrorClass` taxonomy; everything
//! downstream matches on the class instead of re-reading flags.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Structured flags a collaborator may attach to a failure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FailureFlags {
    #[serde(default)]
    pub requires_purchase: bool,
    #[serde(default)]
    pub trial_restriction: bool,
    #[serde(default)]
    pub requires_activation: bool,
    #[serde(default)]
    pub minimum_plan_required: Option<String>,
    #[serde(default)]
    pub tokens_required: Option<u64>,
    #[serde(default)]
    pub tokens_available: Option<u64>,
    #[serde(default)]
    pub tokens_needed: Option<u64>,
}

/// Failure body as sent by the backend
#[derive(Debug, Default, Deserialize)]
struct FailureBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(flatten)]
    flags: FailureFlags,
}

/// A failed collaborator call, before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollaboratorFailure {
    /// HTTP status; `None` when the request never produced a response
    pub status: Option<u16>,
    pub message: String,
    pub flags: FailureFlags,
}

impl CollaboratorFailure {
    pub fn new(status: u16, message: impl Into<String>, flags: FailureFlags) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
            flags,
        }
    }

    /// Transport-level failure (connection refused, timeout, undecodable body)
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            flags: FailureFlags::default(),
        }
    }

    /// Build from a non-success HTTP response body, which may or may not be JSON
    pub fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<FailureBody>(body) {
            Ok(parsed) => Self {
                status: Some(status),
                message: parsed
                    .error
                    .or(parsed.message)
                    .unwrap_or_else(|| format!("request failed with status {status}")),
                flags: parsed.flags,
            },
            Err(_) => {
                let message = if body.trim().is_empty() {
                    format!("request failed with status {status}")
                } else {
                    body.trim().to_string()
                };
                Self {
                    status: Some(status),
                    message,
                    flags: FailureFlags::default(),
                }
            }
        }
    }

    pub fn plan_restricted(minimum_plan: &str) -> Self {
        Self::new(
            403,
            "plan does not include this feature",
            FailureFlags {
                minimum_plan_required: Some(minimum_plan.to_string()),
                ..FailureFlags::default()
            },
        )
    }

    pub fn insufficient_tokens(required: u64, available: u64) -> Self {
        Self::new(
            402,
            "insufficient token balance",
            FailureFlags {
                requires_purchase: true,
                tokens_required: Some(required),
                tokens_available: Some(available),
                ..FailureFlags::default()
            },
        )
    }

    pub fn trial_restricted(requires_activation: bool) -> Self {
        Self::new(
            402,
            "feature withheld during trial",
            FailureFlags {
                trial_restriction: true,
                requires_activation,
                ..FailureFlags::default()
            },
        )
    }
}

impl fmt::Display for CollaboratorFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (status {})", self.message, status),
            None => f.write_str(&self.message),
        }
    }
}

/// Fixed failure taxonomy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "class", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorClass {
    #[serde(rename_all = "camelCase")]
    PlanRestriction { required_plan: Option<String> },
    #[serde(rename_all = "camelCase")]
    TrialRestriction { requires_activation: bool },
    #[serde(rename_all = "camelCase")]
    InsufficientTokens {
        required: u64,
        available: u64,
        needed: u64,
    },
    Generic { message: String },
}

/// What the store owner must do to unblock a job
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequiredAction {
    #[serde(rename_all = "camelCase")]
    UpgradePlan { required_plan: Option<String> },
    ActivatePlan,
    PurchaseTokens { needed: u64 },
    ReduceSelection,
    None,
}

impl ErrorClass {
    /// Store-wide conditions that stop the whole job
    pub fn is_job_wide(&self) -> bool {
        match self {
            Self::PlanRestriction { .. }
            | Self::TrialRestriction { .. }
            | Self::InsufficientTokens { .. } => true,
            Self::Generic { .. } => false,
        }
    }

    /// The legacy trial flag without `requiresActivation` is an upgrade prompt
    pub fn required_action(&self) -> RequiredAction {
        match self {
            Self::PlanRestriction { required_plan } => RequiredAction::UpgradePlan {
                required_plan: required_plan.clone(),
            },
            Self::TrialRestriction {
                requires_activation: true,
            } => RequiredAction::ActivatePlan,
            Self::TrialRestriction {
                requires_activation: false,
            } => RequiredAction::UpgradePlan {
                required_plan: None,
            },
            Self::InsufficientTokens { needed, .. } => {
                RequiredAction::PurchaseTokens { needed: *needed }
            }
            Self::Generic { .. } => RequiredAction::None,
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlanRestriction {
                required_plan: Some(plan),
            } => write!(f, "plan restriction: requires {plan}"),
            Self::PlanRestriction {
                required_plan: None,
            } => f.write_str("plan restriction"),
            Self::TrialRestriction {
                requires_activation,
            } => write!(
                f,
                "trial restriction (activation required: {requires_activation})"
            ),
            Self::InsufficientTokens {
                required,
                available,
                ..
            } => write!(
                f,
                "insufficient tokens: {required} required, {available} available"
            ),
            Self::Generic { message } => f.write_str(message),
        }
    }
}

/// Map a collaborator failure to exactly one class
pub fn classify(failure: &CollaboratorFailure) -> ErrorClass {
    let flags = &failure.flags;
    match failure.status {
        Some(403) => ErrorClass::PlanRestriction {
            required_plan: flags.minimum_plan_required.clone(),
        },
        Some(402) if flags.trial_restriction => ErrorClass::TrialRestriction {
            requires_activation: flags.requires_activation,
        },
        Some(402) if flags.requires_purchase => {
            let required = flags.tokens_required.unwrap_or(0);
            let available = flags.tokens_available.unwrap_or(0);
            ErrorClass::InsufficientTokens {
                required,
                available,
                needed: flags
                    .tokens_needed
                    .unwrap_or_else(|| required.saturating_sub(available)),
            }
        }
        _ => ErrorClass::Generic {
            message: failure.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_is_plan_restriction() {
        let class = classify(&CollaboratorFailure::plan_restricted("growth"));
        assert_eq!(
            class,
            ErrorClass::PlanRestriction {
                required_plan: Some("growth".to_string())
            }
        );
        assert!(class.is_job_wide());
    }

    #[test]
    fn test_trial_variants() {
        let class = classify(&CollaboratorFailure::trial_restricted(true));
        assert_eq!(class.required_action(), RequiredAction::ActivatePlan);

        let legacy = classify(&CollaboratorFailure::trial_restricted(false));
        assert_eq!(
            legacy,
            ErrorClass::TrialRestriction {
                requires_activation: false
            }
        );
        assert_eq!(
            legacy.required_action(),
            RequiredAction::UpgradePlan {
                required_plan: None
            }
        );
    }

    #[test]
    fn test_insufficient_tokens_from_wire_body() {
        let body = r#"{"error":"Not enough tokens","requiresPurchase":true,"tokensAvailable":10,"tokensRequired":50}"#;
        let failure = CollaboratorFailure::from_response(402, body);
        assert_eq!(failure.message, "Not enough tokens");

        let class = classify(&failure);
        assert_eq!(
            class,
            ErrorClass::InsufficientTokens {
                required: 50,
                available: 10,
                needed: 40
            }
        );
        assert_eq!(
            class.required_action(),
            RequiredAction::PurchaseTokens { needed: 40 }
        );
    }

    #[test]
    fn test_body_with_error_and_message_keeps_flags() {
        let body = r#"{"error":"Insufficient tokens","message":"Buy more tokens to continue","requiresPurchase":true,"tokensRequired":50,"tokensAvailable":10}"#;
        let failure = CollaboratorFailure::from_response(402, body);
        assert_eq!(failure.message, "Insufficient tokens");
        assert!(failure.flags.requires_purchase);
        assert_eq!(
            classify(&failure),
            ErrorClass::InsufficientTokens {
                required: 50,
                available: 10,
                needed: 40
            }
        );

        let message_only = CollaboratorFailure::from_response(
            403,
            r#"{"message":"Upgrade required","minimumPlanRequired":"growth"}"#,
        );
        assert_eq!(message_only.message, "Upgrade required");
        assert_eq!(
            classify(&message_only),
            ErrorClass::PlanRestriction {
                required_plan: Some("growth".to_string())
            }
        );
    }

    #[test]
    fn test_everything_else_is_generic() {
        let cases = vec![
            CollaboratorFailure::from_response(500, "upstream exploded"),
            CollaboratorFailure::from_response(402, "{}"),
            CollaboratorFailure::from_response(429, ""),
            CollaboratorFailure::transport("connection refused"),
        ];
        for failure in cases {
            let class = classify(&failure);
            assert!(matches!(class, ErrorClass::Generic { .. }), "{failure:?}");
            assert!(!class.is_job_wide());
        }
    }

    #[test]
    fn test_non_json_body_keeps_text() {
        let failure = CollaboratorFailure::from_response(502, "Bad Gateway\n");
        assert_eq!(failure.message, "Bad Gateway");
        assert_eq!(
            classify(&failure),
            ErrorClass::Generic {
                message: "Bad Gateway (status 502)".to_string()
            }
        );
    }
}
