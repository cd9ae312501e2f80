//! ============================================================================
//! Memory Catalog Gateway - In-process stand-in for the remote catalog
//! ============================================================================
//! Behaves like the REST resource: assigns UUID ids on create, answers
//! missing ids with a 404 status error, echoes the deleted id.
//! ============================================================================

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{CatalogGateway, DeletedItem};
use crate::types::{CatalogItem, GatewayError, ItemDraft};

/// Catalog resource kept in memory
#[derive(Default)]
pub struct MemoryCatalogGateway {
    items: RwLock<Vec<CatalogItem>>,
}

impl MemoryCatalogGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a pre-populated catalog
    pub fn with_items(items: Vec<CatalogItem>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }

    /// Number of stored items
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

fn not_found(id: &str) -> GatewayError {
    GatewayError::Status {
        status: 404,
        body: format!("no item with id {}", id),
    }
}

#[async_trait]
impl CatalogGateway for MemoryCatalogGateway {
    async fn list(&self) -> Result<Vec<CatalogItem>, GatewayError> {
        Ok(self.items.read().await.clone())
    }

    async fn create(&self, draft: &ItemDraft) -> Result<CatalogItem, GatewayError> {
        let item = CatalogItem::from_draft(Uuid::new_v4().to_string(), draft.clone());
        debug!("Memory gateway created item {}", item.id);

        self.items.write().await.push(item.clone());
        Ok(item)
    }

    async fn update(&self, id: &str, item: &CatalogItem) -> Result<CatalogItem, GatewayError> {
        let mut items = self.items.write().await;
        let slot = items
            .iter_mut()
            .find(|existing| existing.id == id)
            .ok_or_else(|| not_found(id))?;

        // The path id wins over whatever the body carries
        let stored = CatalogItem {
            id: id.to_string(),
            ..item.clone()
        };
        *slot = stored.clone();
        Ok(stored)
    }

    async fn remove(&self, id: &str) -> Result<DeletedItem, GatewayError> {
        let mut items = self.items.write().await;
        let before = items.len();
        items.retain(|existing| existing.id != id);

        if items.len() == before {
            return Err(not_found(id));
        }

        Ok(DeletedItem {
            id: Some(id.to_string()),
        })
    }
}
