//! Wire transport used by the sync coordinator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::models::LedgerRecord;

/// A single scan event as pushed over the wire. `qty_received` is a delta.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanUpload {
    pub upc: String,
    pub qty_received: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    pub device_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Delta pull result: changed records plus the server clock to persist as
/// the next watermark.
#[derive(Debug, Clone)]
pub struct PulledDelta {
    pub items: Vec<LedgerRecord>,
    pub server_time: i64,
}

#[async_trait]
pub trait SyncTransport: Send + Sync {
    async fn push_scan(
        &self,
        shipment_id: &str,
        scan: ScanUpload,
    ) -> Result<LedgerRecord, ServiceError>;

    async fn upload_batch(
        &self,
        shipment_id: &str,
        records: Vec<LedgerRecord>,
    ) -> Result<usize, ServiceError>;

    async fn pull_since(
        &self,
        shipment_id: &str,
        last_sync: i64,
    ) -> Result<PulledDelta, ServiceError>;
}

#[async_trait]
impl<T: SyncTransport + ?Sized> SyncTransport for std::sync::Arc<T> {
    async fn push_scan(
        &self,
        shipment_id: &str,
        scan: ScanUpload,
    ) -> Result<LedgerRecord, ServiceError> {
        (**self).push_scan(shipment_id, scan).await
    }

    async fn upload_batch(
        &self,
        shipment_id: &str,
        records: Vec<LedgerRecord>,
    ) -> Result<usize, ServiceError> {
        (**self).upload_batch(shipment_id, records).await
    }

    async fn pull_since(
        &self,
        shipment_id: &str,
        last_sync: i64,
    ) -> Result<PulledDelta, ServiceError> {
        (**self).pull_since(shipment_id, last_sync).await
    }
}

#[derive(Debug, Deserialize)]
struct WireScanResponse {
    item: LedgerRecord,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBatchResponse {
    item_count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSyncResponse {
    items: Vec<LedgerRecord>,
    server_time: i64,
}

#[derive(Debug, Deserialize)]
struct WireError {
    error: String,
}

/// HTTP transport against the receiving API.
#[derive(Clone)]
pub struct HttpSyncTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSyncTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn read_error(response: reqwest::Response) -> ServiceError {
        let status = response.status();
        let message = match response.json::<WireError>().await {
            Ok(body) => body.error,
            Err(_) => format!("server returned {}", status),
        };
        match status.as_u16() {
            404 => ServiceError::NotFound(message),
            409 => ServiceError::Conflict(message),
            400 => ServiceError::InvalidInput(message),
            _ => ServiceError::ExternalServiceError(message),
        }
    }
}

#[async_trait]
impl SyncTransport for HttpSyncTransport {
    async fn push_scan(
        &self,
        shipment_id: &str,
        scan: ScanUpload,
    ) -> Result<LedgerRecord, ServiceError> {
        let url = format!("{}/shipments/{}/received-items", self.base_url, shipment_id);
        let response = self
            .client
            .post(&url)
            .json(&scan)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let body: WireScanResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(e.to_string()))?;
        Ok(body.item)
    }

    async fn upload_batch(
        &self,
        shipment_id: &str,
        records: Vec<LedgerRecord>,
    ) -> Result<usize, ServiceError> {
        let url = format!(
            "{}/shipments/{}/received-items/batch",
            self.base_url, shipment_id
        );
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "receivedItems": records }))
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let body: WireBatchResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(e.to_string()))?;
        Ok(body.item_count)
    }

    async fn pull_since(
        &self,
        shipment_id: &str,
        last_sync: i64,
    ) -> Result<PulledDelta, ServiceError> {
        let url = format!(
            "{}/shipments/{}/received-items/sync",
            self.base_url, shipment_id
        );
        let response = self
            .client
            .get(&url)
            .query(&[("lastSync", last_sync)])
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let body: WireSyncResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(e.to_string()))?;
        Ok(PulledDelta {
            items: body.items,
            server_time: body.server_time,
        })
    }
}
