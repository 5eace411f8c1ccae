//! Receiving API Library
//!
//! Multi-device warehouse receiving: shipment manifests, the reconciled
//! received-item ledger, and the sync surfaces handheld clients talk to.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod models;
pub mod openapi;
pub mod services;
pub mod sync;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post, put},
    Router,
};
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};
use std::sync::Arc;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: events::EventSender,
    ) -> Self {
        let services = handlers::AppServices::new(
            db.clone(),
            event_sender.clone(),
            config.manifest_extractor_url.as_deref(),
        );
        Self {
            db,
            config,
            event_sender,
            services,
        }
    }
}

/// The wire surface consumed by handheld clients.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/shipments", get(handlers::shipments::list_shipments))
        .route(
            "/shipments/:id",
            put(handlers::shipments::upsert_shipment)
                .delete(handlers::shipments::delete_shipment),
        )
        .route(
            "/shipments/:id/complete",
            post(handlers::shipments::complete_shipment),
        )
        .route(
            "/shipments/:id/received-items",
            post(handlers::received_items::push_scan)
                .get(handlers::received_items::fetch_received_items),
        )
        .route(
            "/shipments/:id/received-items/batch",
            post(handlers::received_items::push_batch),
        )
        .route(
            "/shipments/:id/received-items/sync",
            get(handlers::received_items::delta_sync),
        )
        .route("/health", get(health_check))
        .route("/status", get(api_status))
}

async fn api_status() -> Result<Json<Value>, errors::ServiceError> {
    let version = env!("CARGO_PKG_VERSION");
    let status_data = json!({
        "success": true,
        "status": "ok",
        "version": version,
        "service": "receiving-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(status_data))
}

async fn health_check(State(state): State<AppState>) -> Result<Json<Value>, errors::ServiceError> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "success": db_status == "healthy",
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(health_data))
}
