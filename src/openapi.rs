use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Receiving API",
        version = "1.0.0",
        description = r#"
# Warehouse Receiving API

Backend for multi-device warehouse receiving. Handheld scanners record
incoming stock against a shipment's expected-item manifest; the server keeps
the authoritative received-item ledger and reconciles concurrent scans from
any number of devices.

## Sync model

- `POST /shipments/{id}/received-items` pushes a single scan event. The
  quantity is a delta and is applied atomically, so two devices scanning the
  same item at the same time never lose counts.
- `POST /shipments/{id}/received-items/batch` replays a device's local ledger
  after it has been offline. Last writer wins per item key.
- `GET /shipments/{id}/received-items/sync?lastSync=<millis>` returns only
  records changed since the supplied watermark together with `serverTime`,
  which the client persists as its next watermark.

## Error handling

Errors use a consistent envelope with appropriate HTTP status codes:

```json
{
  "success": false,
  "error": "Shipment 1714060000000 not found"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "shipments", description = "Shipment lifecycle endpoints"),
        (name = "received-items", description = "Scan ingestion and ledger sync endpoints")
    ),
    paths(
        // Shipments
        crate::handlers::shipments::upsert_shipment,
        crate::handlers::shipments::list_shipments,
        crate::handlers::shipments::complete_shipment,
        crate::handlers::shipments::delete_shipment,

        // Received items
        crate::handlers::received_items::push_scan,
        crate::handlers::received_items::push_batch,
        crate::handlers::received_items::fetch_received_items,
        crate::handlers::received_items::delta_sync,
    ),
    components(
        schemas(
            // Shipment types
            crate::handlers::shipments::UpsertShipmentRequest,
            crate::handlers::shipments::ListShipmentsResponse,
            crate::handlers::shipments::AckResponse,
            crate::models::ShipmentSummary,
            crate::models::ExpectedItemPayload,

            // Received-item types
            crate::handlers::received_items::ScanRequest,
            crate::handlers::received_items::ScanResponse,
            crate::handlers::received_items::BatchRequest,
            crate::handlers::received_items::BatchResponse,
            crate::handlers::received_items::FetchResponse,
            crate::handlers::received_items::SyncResponse,
            crate::models::LedgerRecord,

            // Error types
            crate::errors::ErrorBody
        )
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
