//! HTTP implementation of every collaborator over a single app backend

use super::generation::{GenerationClient, GenerationRequest, GenerationResponse};
use super::persistence::{PersistenceClient, PersistenceRequest, PersistenceResponse};
use super::sources::{BalanceSource, CatalogSource, EntitlementSource};
use crate::batch::CollaboratorFailure;
use crate::catalog::OptimizableEntity;
use crate::config::CatalystConfig;
use crate::error::{CatalystError, ErrorCode, Result};
use crate::ledger::LedgerSnapshot;
use crate::plan::EntitlementSnapshot;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

const GENERATE_PATH: &str = "api/optimize/generate";
const APPLY_PATH: &str = "api/optimize/apply";
const PLAN_PATH: &str = "api/billing/plan";
const BALANCE_PATH: &str = "api/billing/tokens";
const ENTITIES_PATH: &str = "api/catalog/entities";

/// Envelope for the entity read-back endpoint
#[derive(Debug, Deserialize)]
struct EntitiesResponse {
    #[serde(default)]
    entities: Vec<OptimizableEntity>,
}

/// Client for the app backend that fronts generation, persistence and billing
pub struct HttpCollaborator {
    client: Client,
    base_url: Url,
    api_token: Option<String>,
}

impl HttpCollaborator {
    pub fn new(base_url: &str, api_token: Option<String>, timeout: Duration) -> Result<Self> {
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| {
            CatalystError::config_with_code(
                ErrorCode::CONFIG_INVALID_VALUE,
                format!("Invalid API base URL '{}'", base_url),
            )
            .with_source(e)
        })?;

        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            CatalystError::collaborator(
                ErrorCode::COLLABORATOR_CLIENT_BUILD,
                "Failed to create HTTP client",
                None,
            )
            .with_source(e)
        })?;

        Ok(Self {
            client,
            base_url,
            api_token,
        })
    }

    pub fn from_config(config: &CatalystConfig) -> Result<Self> {
        Self::new(
            &config.api_base_url,
            config.api_token.clone(),
            config.request_timeout(),
        )
    }

    fn endpoint(&self, path: &str) -> std::result::Result<Url, url::ParseError> {
        self.base_url.join(path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// POST whose failures are classified per entity
    async fn post_classified<B, R>(
        &self,
        path: &str,
        body: &B,
    ) -> std::result::Result<R, CollaboratorFailure>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = self
            .endpoint(path)
            .map_err(|e| CollaboratorFailure::transport(format!("invalid endpoint {path}: {e}")))?;

        trace!("POST {}", url);
        let response = self
            .authorized(self.client.post(url))
            .json(body)
            .send()
            .await
            .map_err(|e| CollaboratorFailure::transport(format!("request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<R>()
                .await
                .map_err(|e| CollaboratorFailure::transport(format!("invalid response body: {e}")));
        }

        let text = response.text().await.unwrap_or_default();
        debug!("POST {} returned {}", path, status);
        Err(CollaboratorFailure::from_response(status.as_u16(), &text))
    }

    /// GET for caller-side reads, where any failure is a hard error
    async fn get_json<R>(&self, path: &str, query: &[(&str, String)]) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let endpoint = Some(path.to_string());
        let url = self.endpoint(path).map_err(|e| {
            CatalystError::collaborator(
                ErrorCode::COLLABORATOR_GENERIC,
                "Invalid endpoint",
                endpoint.clone(),
            )
            .with_source(e)
        })?;

        let response = self
            .authorized(self.client.get(url).query(query))
            .send()
            .await
            .map_err(|e| {
                CatalystError::collaborator(
                    ErrorCode::COLLABORATOR_TRANSPORT,
                    "Request failed",
                    endpoint.clone(),
                )
                .with_source(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalystError::collaborator(
                ErrorCode::COLLABORATOR_STATUS,
                format!("Unexpected status {}", status),
                endpoint,
            ));
        }

        response.json::<R>().await.map_err(|e| {
            CatalystError::collaborator(
                ErrorCode::COLLABORATOR_DECODE,
                "Invalid response body",
                endpoint,
            )
            .with_source(e)
        })
    }
}

#[async_trait]
impl GenerationClient for HttpCollaborator {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<GenerationResponse, CollaboratorFailure> {
        self.post_classified(GENERATE_PATH, &request).await
    }
}

#[async_trait]
impl PersistenceClient for HttpCollaborator {
    async fn persist(
        &self,
        request: PersistenceRequest,
    ) -> std::result::Result<PersistenceResponse, CollaboratorFailure> {
        self.post_classified(APPLY_PATH, &request).await
    }
}

#[async_trait]
impl EntitlementSource for HttpCollaborator {
    async fn fetch_entitlement(&self) -> Result<EntitlementSnapshot> {
        self.get_json(PLAN_PATH, &[]).await.map_err(|e| {
            CatalystError::entitlement(
                ErrorCode::ENTITLEMENT_UNAVAILABLE,
                "Could not fetch plan entitlement",
            )
            .with_source(e)
        })
    }
}

#[async_trait]
impl BalanceSource for HttpCollaborator {
    async fn fetch_balance(&self) -> Result<LedgerSnapshot> {
        self.get_json(BALANCE_PATH, &[]).await.map_err(|e| {
            CatalystError::ledger(
                ErrorCode::LEDGER_UNAVAILABLE,
                "Could not fetch token balance",
            )
            .with_source(e)
        })
    }
}

#[async_trait]
impl CatalogSource for HttpCollaborator {
    async fn fetch_entities(&self, ids: &[String]) -> Result<Vec<OptimizableEntity>> {
        let response: EntitiesResponse = self
            .get_json(ENTITIES_PATH, &[("ids", ids.join(","))])
            .await?;
        Ok(response.entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let http = HttpCollaborator::new("https://app.example.com/shop", None, Duration::from_secs(5))
            .unwrap();
        assert_eq!(
            http.endpoint(GENERATE_PATH).unwrap().as_str(),
            "https://app.example.com/shop/api/optimize/generate"
        );
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let err = match HttpCollaborator::new("not a url", None, Duration::from_secs(5)) {
            Ok(_) => panic!("expected an error"),
            Err(e) => e,
        };
        assert_eq!(err.code(), ErrorCode::CONFIG_INVALID_VALUE);
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_classified_as_transport_failure() {
        // Port 9 (discard) on localhost is not expected to accept HTTP
        let http = HttpCollaborator::new("http://127.0.0.1:9", None, Duration::from_millis(500))
            .unwrap();
        let request = GenerationRequest {
            entity_id: "p1".to_string(),
            kind: crate::catalog::EntityKind::Product,
            languages: vec!["en".to_string()],
            model: "test".to_string(),
            ai_enhanced: false,
        };
        let failure = http.generate(request).await.unwrap_err();
        assert_eq!(failure.status, None);
    }
}
