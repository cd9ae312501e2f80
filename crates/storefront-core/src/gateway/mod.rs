//! ============================================================================
//! Gateway Module - Remote persistence of catalog items
//! ============================================================================
//! The catalog store talks to the remote resource only through the
//! `CatalogGateway` trait. Two adapters ship with the crate:
//! - HttpCatalogGateway: REST resource (`GET/POST /items`, `PUT/DELETE /items/{id}`)
//! - MemoryCatalogGateway: in-process double that assigns its own ids
//!
//! ## Usage
//! ```rust,ignore
//! use storefront_core::gateway::{CatalogGateway, HttpCatalogGateway};
//!
//! let gateway = HttpCatalogGateway::new("http://localhost:3000/articles")?;
//! let items = gateway.list().await?;
//! ```
//! ============================================================================

mod http;
mod memory;

pub use http::HttpCatalogGateway;
pub use memory::MemoryCatalogGateway;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{CatalogItem, GatewayError, ItemDraft};

/// Body echoed back by a successful delete; `id` is absent when the
/// server answers with an empty body or `{}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletedItem {
    #[serde(default)]
    pub id: Option<String>,
}

/// Create/read/update/delete of catalog items against a remote resource
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Fetch every item
    async fn list(&self) -> Result<Vec<CatalogItem>, GatewayError>;

    /// Create an item; the returned value carries the assigned id
    async fn create(&self, draft: &ItemDraft) -> Result<CatalogItem, GatewayError>;

    /// Replace the item stored under `id`; returns the stored representation
    async fn update(&self, id: &str, item: &CatalogItem) -> Result<CatalogItem, GatewayError>;

    /// Delete the item stored under `id`
    async fn remove(&self, id: &str) -> Result<DeletedItem, GatewayError>;
}
