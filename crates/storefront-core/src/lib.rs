//! ============================================================================
//! STOREFRONT-CORE: Reactive catalog and cart state
//! ============================================================================
//! This crate owns the canonical storefront data and keeps views in sync:
//! - CatalogStore: remote item set, category filter, visible-items stream
//! - CartStore: line items under stock limits, running total stream
//! - ErrorChannel: process-wide broadcast of failure messages
//! - CatalogGateway: remote persistence (HTTP and in-memory adapters)
//! ============================================================================

pub mod cart;
pub mod catalog;
pub mod config;
pub mod context;
pub mod errors;
pub mod gateway;
pub mod observable;
pub mod types;

// Re-export main types for convenience
pub use types::*;
pub use cart::{cart_total, CartStore};
pub use catalog::CatalogStore;
pub use config::StorefrontConfig;
pub use context::Storefront;
pub use errors::ErrorChannel;
pub use gateway::{CatalogGateway, DeletedItem, HttpCatalogGateway, MemoryCatalogGateway};
pub use observable::{Broadcast, Publication, Subscription};
