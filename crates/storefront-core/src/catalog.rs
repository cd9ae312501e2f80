//! ============================================================================
//! Catalog Store - Canonical item set and category filter
//! ============================================================================
//! Owns every item fetched from the gateway plus the selected category, and
//! publishes the filtered view. The visible list is re-derived from the full
//! set on every change instead of being patched incrementally.
//!
//! Gateway round-trips are the only suspension points. Results are applied
//! to whatever state exists when they settle, so two in-flight calls that
//! finish out of order leave the later-settled result in place.
//! ============================================================================

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::errors::ErrorChannel;
use crate::gateway::{CatalogGateway, DeletedItem};
use crate::observable::{Publication, Subscription};
use crate::types::{CatalogItem, CatalogOperation, CategoryFilter, GatewayError, ItemDraft, StoreError};

struct CatalogState {
    all_items: Vec<CatalogItem>,
    selected: CategoryFilter,
    revision: u64,
}

impl CatalogState {
    fn visible(&self) -> Vec<CatalogItem> {
        self.all_items
            .iter()
            .filter(|item| self.selected.matches(item))
            .cloned()
            .collect()
    }
}

/// Shared catalog state; construct once and hand out through `Arc`
pub struct CatalogStore {
    gateway: Arc<dyn CatalogGateway>,
    errors: Arc<ErrorChannel>,
    state: Mutex<CatalogState>,
    visible: Publication<Vec<CatalogItem>>,
}

impl CatalogStore {
    pub fn new(gateway: Arc<dyn CatalogGateway>, errors: Arc<ErrorChannel>) -> Self {
        Self {
            gateway,
            errors,
            state: Mutex::new(CatalogState {
                all_items: Vec::new(),
                selected: CategoryFilter::All,
                revision: 0,
            }),
            visible: Publication::new(Vec::new()),
        }
    }

    // ========================================================================
    // Remote operations
    // ========================================================================

    /// Replace the whole item set with the gateway's list
    pub async fn load(&self) {
        match self.gateway.list().await {
            Ok(items) => {
                info!("Loaded {} catalog items", items.len());
                self.mutate(|state| state.all_items = items);
            }
            Err(e) => self.fail(CatalogOperation::Load, e),
        }
    }

    /// Create an item remotely and append the returned record
    pub async fn create(&self, draft: ItemDraft) {
        match self.gateway.create(&draft).await {
            Ok(item) => {
                info!("Created item {} ({})", item.id, item.name);
                self.mutate(|state| state.all_items.push(item));
            }
            Err(e) => self.fail(CatalogOperation::Create, e),
        }
    }

    /// Replace an item remotely; the server's representation is stored
    pub async fn update(&self, item: CatalogItem) {
        match self.gateway.update(&item.id, &item).await {
            Ok(updated) => {
                info!("Updated item {}", updated.id);
                self.mutate(|state| {
                    for existing in state.all_items.iter_mut() {
                        if existing.id == updated.id {
                            *existing = updated.clone();
                        }
                    }
                });
            }
            Err(e) => self.fail(CatalogOperation::Update, e),
        }
    }

    /// Delete an item remotely.
    ///
    /// The local entry removed is the one matching the id echoed by the
    /// delete response, which may differ from `id`. A response without an
    /// id removes nothing locally.
    pub async fn remove(&self, id: &str) {
        match self.gateway.remove(id).await {
            Ok(DeletedItem { id: Some(deleted) }) => {
                if deleted != id {
                    warn!("Delete of {} acknowledged id {}", id, deleted);
                }
                info!("Deleted item {}", deleted);
                self.mutate(|state| state.all_items.retain(|item| item.id != deleted));
            }
            Ok(DeletedItem { id: None }) => {
                warn!("Delete of {} acknowledged without an id; keeping local items", id);
                self.mutate(|_| {});
            }
            Err(e) => self.fail(CatalogOperation::Remove, e),
        }
    }

    // ========================================================================
    // Filtering
    // ========================================================================

    pub fn set_category_filter(&self, category: impl Into<CategoryFilter>) {
        let category = category.into();
        debug!("Category filter set to {}", category);
        self.mutate(|state| state.selected = category);
    }

    pub fn reset_filter(&self) {
        self.set_category_filter(CategoryFilter::All);
    }

    pub fn current_category(&self) -> CategoryFilter {
        self.state.lock().selected.clone()
    }

    /// Distinct non-blank categories in first-seen order
    pub fn categories(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut seen = HashSet::new();
        state
            .all_items
            .iter()
            .map(|item| item.category.as_str())
            .filter(|category| !category.trim().is_empty())
            .filter(|category| seen.insert(*category))
            .map(str::to_string)
            .collect()
    }

    // ========================================================================
    // Snapshots and publications
    // ========================================================================

    pub fn all_items(&self) -> Vec<CatalogItem> {
        self.state.lock().all_items.clone()
    }

    pub fn visible_items(&self) -> Vec<CatalogItem> {
        self.visible.get()
    }

    /// Receive the visible items now and after every change
    pub fn subscribe_visible(
        &self,
        handler: impl Fn(&Vec<CatalogItem>) + Send + Sync + 'static,
    ) -> Subscription {
        self.visible.subscribe(handler)
    }

    /// Apply a change and publish the derived view it produced
    fn mutate(&self, change: impl FnOnce(&mut CatalogState)) {
        let (revision, visible) = {
            let mut state = self.state.lock();
            change(&mut state);
            state.revision += 1;
            (state.revision, state.visible())
        };
        self.visible.publish_revision(revision, visible);
    }

    fn fail(&self, operation: CatalogOperation, source: GatewayError) {
        warn!("{}: {}", operation, source);
        self.errors.report(&StoreError::Gateway { operation, source });
    }
}
