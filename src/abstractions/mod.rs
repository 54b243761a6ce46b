//! Abstraction layers for external collaborators
//!
//! This module provides trait-based abstractions for the generation service,
//! content persistence and the billing/catalog read endpoints, so the batch
//! core can be driven by HTTP in production and by mocks in tests.

pub mod generation;
pub mod http;
pub mod mock;
pub mod persistence;
pub mod sources;

pub use generation::{GeneratedContent, GenerationClient, GenerationRequest, GenerationResponse};
pub use http::HttpCollaborator;
pub use mock::{MockCatalogSource, MockGenerationClient, MockPersistenceClient, StaticSources};
pub use persistence::{
    ApplyOptions, PersistenceClient, PersistenceRequest, PersistenceResponse, SeoResult,
};
pub use sources::{BalanceSource, CatalogSource, EntitlementSource};
