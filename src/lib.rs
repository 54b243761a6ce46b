//! # Catalyst
//!
//! Bulk AI optimization of store catalogs under tiered subscription plans and a
//! pay-per-use token balance.
//!
//! ## Usage
//!
//! ```bash
//! catalyst preflight --catalog shop.json --languages en,de
//! catalyst run --catalog shop.json --languages en,de --mode ai-enhanced --apply
//! ```
//!
//! ## Modules
//!
//! - `abstractions` - Collaborator traits (generation, persistence, billing, catalog) with HTTP and mock implementations
//! - `app` - Logging, settings and fatal error handling for the binary
//! - `batch` - Job orchestration: pre-flight gates, windowed dispatch, failure classification, apply phase
//! - `catalog` - Optimizable entities and local catalog state
//! - `cli` - Command line interface
//! - `config` - Layered configuration
//! - `error` - Coded error type
//! - `ledger` - Token balance with reserve/commit/release
//! - `plan` - Plan catalog and feature entitlements
pub mod abstractions;
pub mod app;
pub mod batch;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod ledger;
pub mod plan;

pub use error::{CatalystError, Result};
