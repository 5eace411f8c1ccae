use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::{
    errors::ServiceError,
    models::{ExpectedItemPayload, ShipmentSummary},
    services::shipments::ShipmentUpsert,
    AppState,
};

/// Minimal acknowledgement envelope for mutations that return no payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct AckResponse {
    pub success: bool,
}

impl AckResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// `PUT /shipments/{id}` body. Clients send their full cached shipment;
/// only the metadata fields matter here and unknown fields are ignored.
#[derive(Debug, Deserialize, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "date": "2024-04-25T08:30:00Z",
    "documentIds": ["PO-10021", "PO-10022"],
    "expectedItems": [
        {"itemNumber": "100342", "description": "3/4in copper elbow", "upc": "036000291452", "qtyExpected": 100, "documentId": "PO-10021"}
    ]
}))]
pub struct UpsertShipmentRequest {
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub document_ids: Vec<String>,
    /// Written on create only; the manifest is immutable afterwards
    #[serde(default)]
    pub expected_items: Vec<ExpectedItemPayload>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListShipmentsResponse {
    pub success: bool,
    pub shipments: Vec<ShipmentSummary>,
}

#[utoipa::path(
    put,
    path = "/shipments/{id}",
    params(("id" = String, Path, description = "Shipment ID")),
    request_body = UpsertShipmentRequest,
    responses(
        (status = 200, description = "Shipment upserted", body = AckResponse),
        (status = 409, description = "Shipment already completed", body = crate::errors::ErrorBody)
    ),
    tag = "shipments"
)]
pub async fn upsert_shipment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpsertShipmentRequest>,
) -> Result<Json<AckResponse>, ServiceError> {
    state
        .services
        .shipments
        .upsert_shipment(
            &id,
            ShipmentUpsert {
                date: payload.date,
                document_ids: payload.document_ids,
                expected_items: payload.expected_items,
            },
        )
        .await?;

    Ok(Json(AckResponse::ok()))
}

#[utoipa::path(
    get,
    path = "/shipments",
    responses(
        (status = 200, description = "Shipments listed, newest first", body = ListShipmentsResponse)
    ),
    tag = "shipments"
)]
pub async fn list_shipments(
    State(state): State<AppState>,
) -> Result<Json<ListShipmentsResponse>, ServiceError> {
    let shipments = state
        .services
        .shipments
        .list_shipments()
        .await?
        .into_iter()
        .map(ShipmentSummary::from)
        .collect();

    Ok(Json(ListShipmentsResponse {
        success: true,
        shipments,
    }))
}

#[utoipa::path(
    post,
    path = "/shipments/{id}/complete",
    params(("id" = String, Path, description = "Shipment ID")),
    responses(
        (status = 200, description = "Shipment completed", body = AckResponse),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorBody)
    ),
    tag = "shipments"
)]
pub async fn complete_shipment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AckResponse>, ServiceError> {
    state.services.shipments.complete_shipment(&id).await?;
    Ok(Json(AckResponse::ok()))
}

#[utoipa::path(
    delete,
    path = "/shipments/{id}",
    params(("id" = String, Path, description = "Shipment ID")),
    responses(
        (status = 200, description = "Shipment and ledger deleted", body = AckResponse),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorBody)
    ),
    tag = "shipments"
)]
pub async fn delete_shipment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AckResponse>, ServiceError> {
    state.services.shipments.delete_shipment(&id).await?;
    Ok(Json(AckResponse::ok()))
}
