use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    errors::ServiceError,
    models::{self, LedgerRecord},
    services::reconciliation::ScanEvent,
    AppState,
};

/// `POST /shipments/{id}/received-items` body. `qtyReceived` is a delta:
/// another unit was physically scanned, not a correction.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "upc": "036000291452",
    "qtyReceived": 1,
    "documentId": "PO-10021",
    "deviceId": "device-a81f",
    "username": "mreyes",
    "name": "M. Reyes"
}))]
pub struct ScanRequest {
    #[validate(length(min = 1))]
    pub upc: String,
    /// Units scanned in this event (positive delta)
    pub qty_received: i64,
    #[serde(default)]
    pub document_id: Option<String>,
    #[validate(length(min = 1))]
    pub device_id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ScanResponse {
    pub success: bool,
    pub item: LedgerRecord,
}

/// `POST .../received-items/batch` body: one device's full local ledger.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub received_items: Vec<LedgerRecord>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub success: bool,
    pub item_count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FetchResponse {
    pub success: bool,
    pub received_items: Vec<LedgerRecord>,
}

#[derive(Debug, Deserialize, Default, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SyncQuery {
    /// Unix-millisecond watermark; records with `lastUpdated` beyond it are
    /// returned. Omitted or zero means the full ledger.
    #[serde(default)]
    pub last_sync: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub success: bool,
    pub items: Vec<LedgerRecord>,
    /// Server clock at response time; clients persist this as their next
    /// `lastSync` watermark
    pub server_time: i64,
}

#[utoipa::path(
    post,
    path = "/shipments/{id}/received-items",
    params(("id" = String, Path, description = "Shipment ID")),
    request_body = ScanRequest,
    responses(
        (status = 200, description = "Scan applied", body = ScanResponse),
        (status = 400, description = "Invalid scan", body = crate::errors::ErrorBody),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorBody),
        (status = 409, description = "Shipment already completed", body = crate::errors::ErrorBody)
    ),
    tag = "received-items"
)]
pub async fn push_scan(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<ScanRequest>,
) -> Result<Json<ScanResponse>, ServiceError> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let item = state
        .services
        .reconciliation
        .apply_scan(
            &id,
            ScanEvent {
                upc: payload.upc,
                document_id: payload.document_id,
                delta_qty: payload.qty_received,
                device_id: payload.device_id,
                username: payload.username,
                name: payload.name,
            },
        )
        .await?;

    Ok(Json(ScanResponse {
        success: true,
        item,
    }))
}

#[utoipa::path(
    post,
    path = "/shipments/{id}/received-items/batch",
    params(("id" = String, Path, description = "Shipment ID")),
    request_body = BatchRequest,
    responses(
        (status = 200, description = "Batch merged, last writer wins per key", body = BatchResponse),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorBody),
        (status = 409, description = "Shipment already completed", body = crate::errors::ErrorBody)
    ),
    tag = "received-items"
)]
pub async fn push_batch(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<BatchRequest>,
) -> Result<Json<BatchResponse>, ServiceError> {
    let item_count = state
        .services
        .reconciliation
        .batch_merge(&id, payload.received_items)
        .await?;

    Ok(Json(BatchResponse {
        success: true,
        item_count,
    }))
}

#[utoipa::path(
    get,
    path = "/shipments/{id}/received-items",
    params(("id" = String, Path, description = "Shipment ID")),
    responses(
        (status = 200, description = "Full ledger in creation order", body = FetchResponse),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorBody)
    ),
    tag = "received-items"
)]
pub async fn fetch_received_items(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FetchResponse>, ServiceError> {
    let received_items = state.services.reconciliation.pull_all(&id).await?;

    Ok(Json(FetchResponse {
        success: true,
        received_items,
    }))
}

#[utoipa::path(
    get,
    path = "/shipments/{id}/received-items/sync",
    params(
        ("id" = String, Path, description = "Shipment ID"),
        SyncQuery
    ),
    responses(
        (status = 200, description = "Delta since the supplied watermark", body = SyncResponse),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorBody)
    ),
    tag = "received-items"
)]
pub async fn delta_sync(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SyncQuery>,
) -> Result<Json<SyncResponse>, ServiceError> {
    let since = query.last_sync.unwrap_or(0);
    let items = state.services.reconciliation.pull_since(&id, since).await?;

    Ok(Json(SyncResponse {
        success: true,
        items,
        server_time: models::now_millis(),
    }))
}
