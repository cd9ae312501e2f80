//! ============================================================================
//! Storefront Context - The one catalog and cart shared by every view
//! ============================================================================
//! Build a `Storefront` once at startup and clone it into each view. Clones
//! share the same stores, so all views observe one canonical state.
//! ============================================================================

use std::sync::Arc;
use tracing::info;

use crate::cart::CartStore;
use crate::catalog::CatalogStore;
use crate::config::StorefrontConfig;
use crate::errors::ErrorChannel;
use crate::gateway::{CatalogGateway, HttpCatalogGateway};
use crate::types::GatewayError;

#[derive(Clone)]
pub struct Storefront {
    catalog: Arc<CatalogStore>,
    cart: Arc<CartStore>,
    errors: Arc<ErrorChannel>,
}

impl Storefront {
    /// Stores wired to the process-wide error channel
    pub fn new(gateway: Arc<dyn CatalogGateway>) -> Self {
        Self::with_errors(gateway, ErrorChannel::global())
    }

    /// Stores wired to a caller-provided error channel
    pub fn with_errors(gateway: Arc<dyn CatalogGateway>, errors: Arc<ErrorChannel>) -> Self {
        Self {
            catalog: Arc::new(CatalogStore::new(gateway, Arc::clone(&errors))),
            cart: Arc::new(CartStore::new(Arc::clone(&errors))),
            errors,
        }
    }

    /// Stores backed by the HTTP catalog described in `config`
    pub fn from_config(config: &StorefrontConfig) -> Result<Self, GatewayError> {
        let gateway = HttpCatalogGateway::from_config(config)?;
        info!("Storefront using remote catalog at {}", gateway.base_url());
        Ok(Self::new(Arc::new(gateway)))
    }

    pub fn catalog(&self) -> &Arc<CatalogStore> {
        &self.catalog
    }

    pub fn cart(&self) -> &Arc<CartStore> {
        &self.cart
    }

    pub fn errors(&self) -> &Arc<ErrorChannel> {
        &self.errors
    }
}
