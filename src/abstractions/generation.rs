//! Generation collaborator
//!
//! The model call itself lives outside this crate. The orchestrator only sees a
//! request per entity and either generated content or a structured failure.

use crate::batch::CollaboratorFailure;
use crate::catalog::{EntityKind, LanguageCode};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One generation call for one entity
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub entity_id: String,
    pub kind: EntityKind,
    pub languages: Vec<LanguageCode>,
    pub model: String,
    pub ai_enhanced: bool,
}

/// Generated content for one language
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratedContent {
    pub language: LanguageCode,
    pub data: serde_json::Value,
}

/// Successful generation response
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GenerationResponse {
    #[serde(default)]
    pub results: Vec<GeneratedContent>,
}

/// Trait for the content generation service
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate content for the requested languages of one entity.
    ///
    /// Every failure, including transport errors, is returned as a
    /// `CollaboratorFailure` so it can be classified.
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, CollaboratorFailure>;
}
