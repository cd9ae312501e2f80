//! ============================================================================
//! Core Types for the Storefront
//! ============================================================================
//! Catalog items, drafts, cart lines, the category filter and the error
//! taxonomy shared by both stores. Items are serialized to JSON for the
//! remote catalog resource.
//! ============================================================================

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A purchasable product record.
///
/// Immutable once fetched; an update replaces the whole value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Identifier assigned by the remote catalog
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub name: String,
    pub brand: String,
    pub price: f64,
    pub category: String,
    pub description: String,
    /// Upper bound on the purchasable quantity
    pub stock: u32,
    #[serde(default)]
    pub image: String,
}

impl CatalogItem {
    /// Attach a server-assigned id to a draft
    pub fn from_draft(id: impl Into<String>, draft: ItemDraft) -> Self {
        Self {
            id: id.into(),
            name: draft.name,
            brand: draft.brand,
            price: draft.price,
            category: draft.category,
            description: draft.description,
            stock: draft.stock,
            image: draft.image.unwrap_or_default(),
        }
    }

    /// Strip the id, e.g. to edit an existing item through a form
    pub fn to_draft(&self) -> ItemDraft {
        ItemDraft {
            name: self.name.clone(),
            brand: self.brand.clone(),
            price: self.price,
            category: self.category.clone(),
            description: self.description.clone(),
            stock: self.stock,
            image: Some(self.image.clone()).filter(|i| !i.is_empty()),
        }
    }
}

/// A catalog item that has not been created remotely yet (no id)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDraft {
    pub name: String,
    pub brand: String,
    pub price: f64,
    pub category: String,
    pub description: String,
    pub stock: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl ItemDraft {
    /// Form-side checks run before a draft is sent to the catalog
    pub fn validate(&self) -> Result<(), StoreError> {
        let required = [
            ("name", &self.name),
            ("brand", &self.brand),
            ("category", &self.category),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(StoreError::InvalidItem(format!("{} is required", field)));
            }
        }

        if !self.price.is_finite() || self.price < 0.0 {
            return Err(StoreError::InvalidItem(format!(
                "price must be a non-negative number, got {}",
                self.price
            )));
        }

        Ok(())
    }
}

/// One catalog item snapshot paired with a requested quantity.
///
/// The item is copied when it enters the cart. Later catalog changes (stock
/// included) are not reflected in the line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub item: CatalogItem,
    pub quantity: u32,
}

impl CartLine {
    pub fn subtotal(&self) -> f64 {
        self.item.price * self.quantity as f64
    }
}

/// Active category filter of the catalog
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Named(String),
}

impl CategoryFilter {
    /// Parse user input; `"all"` in any case selects every item
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            CategoryFilter::All
        } else {
            CategoryFilter::Named(trimmed.to_string())
        }
    }

    /// Case-insensitive (lower-cased) category match
    pub fn matches(&self, item: &CatalogItem) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Named(category) => {
                item.category.to_lowercase() == category.to_lowercase()
            }
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => write!(f, "all"),
            CategoryFilter::Named(category) => write!(f, "{}", category),
        }
    }
}

impl From<&str> for CategoryFilter {
    fn from(value: &str) -> Self {
        CategoryFilter::parse(value)
    }
}

/// Catalog round-trips, used to label gateway failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogOperation {
    Load,
    Create,
    Update,
    Remove,
}

impl fmt::Display for CatalogOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CatalogOperation::Load => "Failed to load items",
            CatalogOperation::Create => "Failed to create item",
            CatalogOperation::Update => "Failed to update item",
            CatalogOperation::Remove => "Failed to delete item",
        };
        f.write_str(text)
    }
}

/// Failure of a remote catalog call
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Remote catalog answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response body: {0}")]
    Decode(String),
}

/// Failures detected by the stores.
///
/// The `Display` text is what subscribers of the error channel receive.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("{operation}")]
    Gateway {
        operation: CatalogOperation,
        #[source]
        source: GatewayError,
    },

    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: u32, available: u32 },

    #[error("Item not found in cart: {0}")]
    LineNotFound(String),

    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    #[error("Invalid item: {0}")]
    InvalidItem(String),
}

/// Remote catalogs disagree on id representation; accept both and keep text
fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

/// Round a money amount to cents
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
