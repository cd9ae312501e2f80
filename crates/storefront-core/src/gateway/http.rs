//! ============================================================================
//! HTTP Catalog Gateway - REST resource backed by reqwest
//! ============================================================================
//! Talks to a JSON collection resource:
//! - GET    {base}        list items
//! - POST   {base}        create item (draft body, no id)
//! - PUT    {base}/{id}   replace item
//! - DELETE {base}/{id}   delete item
//! ============================================================================

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::{CatalogGateway, DeletedItem};
use crate::config::{StorefrontConfig, DEFAULT_IMAGE};
use crate::types::{CatalogItem, GatewayError, ItemDraft};

/// Gateway for a REST collection of catalog items
pub struct HttpCatalogGateway {
    client: Client,
    base_url: String,
    default_image: String,
}

impl HttpCatalogGateway {
    /// Create a gateway for the collection at `base_url`
    pub fn new(base_url: impl Into<String>) -> Result<Self, GatewayError> {
        Self::with_options(base_url, DEFAULT_IMAGE, None)
    }

    /// Create a gateway from loaded configuration
    pub fn from_config(config: &StorefrontConfig) -> Result<Self, GatewayError> {
        Self::with_options(
            config.api_url.clone(),
            config.default_image.clone(),
            Some(Duration::from_secs(config.request_timeout_secs)),
        )
    }

    fn with_options(
        base_url: impl Into<String>,
        default_image: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, GatewayError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| GatewayError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            default_image: default_image.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn item_url(&self, id: &str) -> String {
        format!("{}/{}", self.base_url, id)
    }

    /// Drafts without an image get the configured placeholder
    fn prepare_draft(&self, draft: &ItemDraft) -> ItemDraft {
        let mut draft = draft.clone();
        if draft.image.as_deref().map_or(true, |i| i.trim().is_empty()) {
            draft.image = Some(self.default_image.clone());
        }
        draft
    }
}

#[async_trait]
impl CatalogGateway for HttpCatalogGateway {
    async fn list(&self) -> Result<Vec<CatalogItem>, GatewayError> {
        debug!("GET {}", self.base_url);

        let response = self
            .client
            .get(&self.base_url)
            .send()
            .await
            .map_err(transport)?;

        let items: Vec<CatalogItem> = read_json(response).await?;
        debug!("Fetched {} items", items.len());
        Ok(items)
    }

    async fn create(&self, draft: &ItemDraft) -> Result<CatalogItem, GatewayError> {
        debug!("POST {} ({})", self.base_url, draft.name);

        let response = self
            .client
            .post(&self.base_url)
            .json(&self.prepare_draft(draft))
            .send()
            .await
            .map_err(transport)?;

        read_json(response).await
    }

    async fn update(&self, id: &str, item: &CatalogItem) -> Result<CatalogItem, GatewayError> {
        let url = self.item_url(id);
        debug!("PUT {}", url);

        let response = self
            .client
            .put(&url)
            .json(item)
            .send()
            .await
            .map_err(transport)?;

        read_json(response).await
    }

    async fn remove(&self, id: &str) -> Result<DeletedItem, GatewayError> {
        let url = self.item_url(id);
        debug!("DELETE {}", url);

        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(transport)?;

        let body = read_body(response).await?;
        Ok(DeletedItem {
            id: deleted_id(&body)?,
        })
    }
}

fn transport(e: reqwest::Error) -> GatewayError {
    GatewayError::Transport(e.to_string())
}

/// Read the body, turning any non-2xx status into an error
async fn read_body(response: Response) -> Result<String, GatewayError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| GatewayError::Transport(format!("Failed to read response body: {}", e)))?;

    if !status.is_success() {
        return Err(GatewayError::Status {
            status: status.as_u16(),
            body,
        });
    }

    Ok(body)
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let body = read_body(response).await?;
    serde_json::from_str(&body).map_err(|e| GatewayError::Decode(format!("{} - body: {}", e, body)))
}

/// Id echoed by a delete response.
///
/// Some servers answer with the deleted record, others with an empty body
/// or `{}`; the latter yield `None`.
fn deleted_id(body: &str) -> Result<Option<String>, GatewayError> {
    if body.trim().is_empty() {
        return Ok(None);
    }

    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| GatewayError::Decode(e.to_string()))?;

    match value.get("id") {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s.clone())),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(GatewayError::Decode(format!("unexpected id in delete response: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_creation() {
        let gateway = HttpCatalogGateway::new("http://localhost:3000/articles/").unwrap();
        assert_eq!(gateway.base_url(), "http://localhost:3000/articles");
        assert_eq!(gateway.item_url("42"), "http://localhost:3000/articles/42");
    }

    #[test]
    fn test_from_config() {
        let config = StorefrontConfig {
            api_url: "http://catalog.test/items".to_string(),
            default_image: "https://cdn.test/none.png".to_string(),
            request_timeout_secs: 3,
        };
        let gateway = HttpCatalogGateway::from_config(&config).unwrap();
        assert_eq!(gateway.base_url(), "http://catalog.test/items");
        assert_eq!(gateway.default_image, "https://cdn.test/none.png");
    }

    #[test]
    fn test_draft_gets_default_image() {
        let gateway = HttpCatalogGateway::new("http://localhost:3000/articles").unwrap();
        let mut draft = ItemDraft {
            name: "Ball".to_string(),
            brand: "Acme".to_string(),
            price: 20.0,
            category: "Balls".to_string(),
            description: String::new(),
            stock: 1,
            image: Some(" ".to_string()),
        };

        assert_eq!(gateway.prepare_draft(&draft).image.as_deref(), Some(DEFAULT_IMAGE));

        draft.image = Some("https://cdn.test/ball.png".to_string());
        assert_eq!(
            gateway.prepare_draft(&draft).image.as_deref(),
            Some("https://cdn.test/ball.png")
        );
    }

    #[test]
    fn test_deleted_id_parsing() {
        assert_eq!(deleted_id(r#"{"id": "a1", "name": "x"}"#).unwrap(), Some("a1".to_string()));
        assert_eq!(deleted_id(r#"{"id": 5}"#).unwrap(), Some("5".to_string()));
        assert_eq!(deleted_id("{}").unwrap(), None);
        assert_eq!(deleted_id("").unwrap(), None);
        assert!(deleted_id("not json").is_err());
        assert!(deleted_id(r#"{"id": [1]}"#).is_err());
    }

    /// Serve one canned JSON response on a local port
    async fn serve_once(body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 2048];
            let _ = socket.read(&mut request).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{}/articles", addr)
    }

    #[tokio::test]
    async fn test_delete_without_id_echoes_nothing() {
        let gateway = HttpCatalogGateway::new(serve_once("{}").await).unwrap();
        let deleted = gateway.remove("42").await.unwrap();
        assert_eq!(deleted.id, None);
    }

    #[tokio::test]
    async fn test_delete_echoes_server_id() {
        let gateway = HttpCatalogGateway::new(serve_once(r#"{"id": 7}"#).await).unwrap();
        let deleted = gateway.remove("42").await.unwrap();
        assert_eq!(deleted.id.as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let gateway = HttpCatalogGateway::new("http://127.0.0.1:9/articles").unwrap();
        let result = gateway.list().await;
        assert!(matches!(result, Err(GatewayError::Transport(_))));
    }
}
