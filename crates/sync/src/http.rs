//! Remote sources speaking the kitchenflow HTTP API.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use kitchenflow_core::OrderId;
use kitchenflow_inventory::{AlertId, InventoryItem};
use kitchenflow_kitchen::Order;

use crate::alerts::InventorySource;
use crate::error::FetchError;
use crate::source::SnapshotSource;

/// Thin client for the read endpoints plus alert acknowledgement.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    api_url: String,
}

impl ApiClient {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Base URL from `KITCHENFLOW_API_URL`, defaulting to a local server.
    pub fn from_env() -> Self {
        let url = std::env::var("KITCHENFLOW_API_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8080".to_string());
        Self::new(url)
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Check connectivity by hitting the health endpoint.
    pub async fn check_connectivity(&self) -> bool {
        let url = format!("{}/health", self.api_url);
        matches!(self.client.get(&url).send().await, Ok(resp) if resp.status().is_success())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = format!("{}{}", self.api_url, path);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound);
        }
        if !status.is_success() {
            return Err(FetchError::Api(
                status.as_u16(),
                resp.text().await.unwrap_or_default(),
            ));
        }

        resp.json().await.map_err(|e| FetchError::Parse(e.to_string()))
    }
}

/// `GET /orders/{id}`.
#[derive(Debug, Clone)]
pub struct HttpOrderSource {
    api: ApiClient,
}

impl HttpOrderSource {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl SnapshotSource for HttpOrderSource {
    type Key = OrderId;
    type Snapshot = Order;

    async fn fetch(&self, key: &OrderId) -> Result<Order, FetchError> {
        self.api.get_json(&format!("/orders/{key}")).await
    }
}

/// `GET /inventory/items` and `POST /alerts/{id}/acknowledge`.
#[derive(Debug, Clone)]
pub struct HttpInventorySource {
    api: ApiClient,
}

impl HttpInventorySource {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl InventorySource for HttpInventorySource {
    async fn inventory_items(&self) -> Result<Vec<InventoryItem>, FetchError> {
        self.api.get_json("/inventory/items").await
    }

    async fn acknowledge_alert(&self, alert_id: &AlertId) -> Result<(), FetchError> {
        let url = format!("{}/alerts/{}/acknowledge", self.api.api_url, alert_id);
        let resp = self
            .api
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound);
        }
        if !status.is_success() {
            return Err(FetchError::Api(
                status.as_u16(),
                resp.text().await.unwrap_or_default(),
            ));
        }
        Ok(())
    }
}
