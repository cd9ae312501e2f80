//! ============================================================================
//! Storefront Configuration
//! ============================================================================
//! Defaults come from the environment (load `.env` first in binaries):
//! - STOREFRONT_API_URL        remote catalog collection
//! - STOREFRONT_DEFAULT_IMAGE  image used for drafts without one
//! - STOREFRONT_TIMEOUT_SECS   HTTP request timeout
//! ============================================================================

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Catalog collection used when nothing is configured
pub const DEFAULT_API_URL: &str = "http://localhost:3000/articles";

/// Placeholder image for newly created items
pub const DEFAULT_IMAGE: &str = "https://example.com/default.jpg";

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorefrontConfig {
    pub api_url: String,
    pub default_image: String,
    pub request_timeout_secs: u64,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

impl StorefrontConfig {
    /// Build from an arbitrary key lookup (env in production, maps in tests)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let request_timeout_secs = match lookup("STOREFRONT_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!(
                    "Invalid STOREFRONT_TIMEOUT_SECS '{}', using {}s",
                    raw, DEFAULT_TIMEOUT_SECS
                );
                DEFAULT_TIMEOUT_SECS
            }),
            None => DEFAULT_TIMEOUT_SECS,
        };

        Self {
            api_url: lookup("STOREFRONT_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            default_image: lookup("STOREFRONT_DEFAULT_IMAGE")
                .unwrap_or_else(|| DEFAULT_IMAGE.to_string()),
            request_timeout_secs,
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_without_env() {
        let config = StorefrontConfig::from_lookup(|_| None);
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.default_image, DEFAULT_IMAGE);
        assert_eq!(config.request_timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_lookup_overrides() {
        let env: HashMap<&str, &str> = [
            ("STOREFRONT_API_URL", "http://shop.test/items"),
            ("STOREFRONT_TIMEOUT_SECS", "30"),
        ]
        .into_iter()
        .collect();

        let config = StorefrontConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.api_url, "http://shop.test/items");
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.default_image, DEFAULT_IMAGE);
    }

    #[test]
    fn test_bad_timeout_falls_back() {
        let config = StorefrontConfig::from_lookup(|k| {
            (k == "STOREFRONT_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert_eq!(config.request_timeout_secs, DEFAULT_TIMEOUT_SECS);

        let config = config.with_api_url("http://other.test");
        assert_eq!(config.api_url, "http://other.test");
    }
}
