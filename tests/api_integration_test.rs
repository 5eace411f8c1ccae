mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

fn upsert_body() -> serde_json::Value {
    json!({
        "date": "2024-04-25T08:30:00Z",
        "documentIds": ["PO-10021"],
        "expectedItems": [
            {
                "itemNumber": "100342",
                "description": "3/4in copper elbow",
                "upc": "036000291452",
                "qtyExpected": 100,
                "documentId": "PO-10021"
            }
        ]
    })
}

fn scan_body(upc: &str, qty: i64, device: &str) -> serde_json::Value {
    json!({
        "upc": upc,
        "qtyReceived": qty,
        "documentId": "PO-10021",
        "deviceId": device,
        "username": "mreyes",
        "name": "M. Reyes"
    })
}

#[tokio::test]
async fn shipment_upsert_and_listing() {
    let app = TestApp::new().await;

    let body = app
        .request_json(
            Method::PUT,
            "/shipments/1714060000000",
            Some(upsert_body()),
            StatusCode::OK,
        )
        .await;
    assert_eq!(body, json!({ "success": true }));

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    app.request_json(
        Method::PUT,
        "/shipments/1714060000001",
        Some(json!({})),
        StatusCode::OK,
    )
    .await;

    let body = app
        .request_json(Method::GET, "/shipments", None, StatusCode::OK)
        .await;
    assert_eq!(body["success"], json!(true));
    let shipments = body["shipments"].as_array().unwrap();
    assert_eq!(shipments.len(), 2);
    // Newest first
    assert_eq!(shipments[0]["id"], "1714060000001");
    assert_eq!(shipments[1]["id"], "1714060000000");
    assert_eq!(shipments[1]["status"], "in-progress");
    assert_eq!(shipments[1]["documentIds"], json!(["PO-10021"]));
}

#[tokio::test]
async fn scan_push_returns_the_reconciled_record() {
    let app = TestApp::new().await;
    app.request_json(
        Method::PUT,
        "/shipments/s1",
        Some(upsert_body()),
        StatusCode::OK,
    )
    .await;

    app.request_json(
        Method::POST,
        "/shipments/s1/received-items",
        Some(scan_body("036000291452", 40, "device-a")),
        StatusCode::OK,
    )
    .await;
    let body = app
        .request_json(
            Method::POST,
            "/shipments/s1/received-items",
            Some(scan_body("036000291452", 30, "device-b")),
            StatusCode::OK,
        )
        .await;

    assert_eq!(body["success"], json!(true));
    let item = &body["item"];
    assert_eq!(item["upc"], "036000291452");
    assert_eq!(item["qtyReceived"], 70);
    assert_eq!(item["qtyExpected"], 100);
    assert_eq!(item["discrepancy"], -30);
    assert_eq!(item["documentId"], "PO-10021");
    let devices = item["scannedBy"].as_array().unwrap();
    assert_eq!(devices.len(), 2);
}

#[tokio::test]
async fn invalid_scan_is_rejected_with_the_error_envelope() {
    let app = TestApp::new().await;
    app.request_json(Method::PUT, "/shipments/s1", Some(json!({})), StatusCode::OK)
        .await;

    let body = app
        .request_json(
            Method::POST,
            "/shipments/s1/received-items",
            Some(scan_body("036000291452", 0, "device-a")),
            StatusCode::BAD_REQUEST,
        )
        .await;
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn batch_upload_reports_item_count() {
    let app = TestApp::new().await;
    app.request_json(Method::PUT, "/shipments/s1", Some(json!({})), StatusCode::OK)
        .await;

    let body = app
        .request_json(
            Method::POST,
            "/shipments/s1/received-items/batch",
            Some(json!({
                "receivedItems": [
                    { "upc": "111", "qtyReceived": 3, "scannedBy": ["device-a"] },
                    { "upc": "222", "qtyReceived": 5, "scannedBy": ["device-a"] }
                ]
            })),
            StatusCode::OK,
        )
        .await;
    assert_eq!(body, json!({ "success": true, "itemCount": 2 }));

    let body = app
        .request_json(
            Method::GET,
            "/shipments/s1/received-items",
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["receivedItems"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn delta_sync_honors_the_watermark_and_reports_server_time() {
    let app = TestApp::new().await;
    app.request_json(Method::PUT, "/shipments/s1", Some(json!({})), StatusCode::OK)
        .await;
    app.request_json(
        Method::POST,
        "/shipments/s1/received-items",
        Some(scan_body("111", 1, "device-a")),
        StatusCode::OK,
    )
    .await;

    let body = app
        .request_json(
            Method::GET,
            "/shipments/s1/received-items/sync",
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    let server_time = body["serverTime"].as_i64().unwrap();
    assert!(server_time > 0);

    // Nothing changed since the reported server clock.
    let uri = format!("/shipments/s1/received-items/sync?lastSync={server_time}");
    let body = app
        .request_json(Method::GET, &uri, None, StatusCode::OK)
        .await;
    assert!(body["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn completion_freezes_the_wire_surface() {
    let app = TestApp::new().await;
    app.request_json(Method::PUT, "/shipments/s1", Some(json!({})), StatusCode::OK)
        .await;

    let body = app
        .request_json(
            Method::POST,
            "/shipments/s1/complete",
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(body, json!({ "success": true }));

    // Repeat completion stays a success.
    app.request_json(
        Method::POST,
        "/shipments/s1/complete",
        None,
        StatusCode::OK,
    )
    .await;

    let body = app
        .request_json(
            Method::POST,
            "/shipments/s1/received-items",
            Some(scan_body("111", 1, "device-a")),
            StatusCode::CONFLICT,
        )
        .await;
    assert_eq!(body["success"], json!(false));

    app.request_json(
        Method::PUT,
        "/shipments/s1",
        Some(json!({})),
        StatusCode::CONFLICT,
    )
    .await;

    // Reads remain open.
    app.request_json(
        Method::GET,
        "/shipments/s1/received-items",
        None,
        StatusCode::OK,
    )
    .await;
}

#[tokio::test]
async fn deletion_cascades_and_unknown_targets_are_not_found() {
    let app = TestApp::new().await;

    app.request_json(
        Method::DELETE,
        "/shipments/missing",
        None,
        StatusCode::NOT_FOUND,
    )
    .await;

    app.request_json(
        Method::PUT,
        "/shipments/s1",
        Some(upsert_body()),
        StatusCode::OK,
    )
    .await;
    app.request_json(
        Method::POST,
        "/shipments/s1/received-items",
        Some(scan_body("036000291452", 2, "device-a")),
        StatusCode::OK,
    )
    .await;

    let body = app
        .request_json(Method::DELETE, "/shipments/s1", None, StatusCode::OK)
        .await;
    assert_eq!(body, json!({ "success": true }));

    // Ledger went with the shipment.
    app.request_json(
        Method::GET,
        "/shipments/s1/received-items",
        None,
        StatusCode::NOT_FOUND,
    )
    .await;
}
