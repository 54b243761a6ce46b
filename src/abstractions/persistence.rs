//! Persistence collaborator used by the apply phase

use crate::batch::CollaboratorFailure;
use crate::catalog::LanguageCode;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Content to persist for one language
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeoResult {
    pub language: LanguageCode,
    pub seo: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplyOptions {
    pub ai_enhanced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceRequest {
    pub entity_id: String,
    pub results: Vec<SeoResult>,
    pub options: ApplyOptions,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceResponse {
    pub ok: bool,
    #[serde(default)]
    pub applied_languages: Vec<LanguageCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Trait for durably storing generated content
#[async_trait]
pub trait PersistenceClient: Send + Sync {
    async fn persist(
        &self,
        request: PersistenceRequest,
    ) -> Result<PersistenceResponse, CollaboratorFailure>;
}
