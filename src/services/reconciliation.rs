use chrono::Utc;
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ActiveModelTrait,
    ActiveValue::Set,
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::{
    db::DbPool,
    entities::{
        expected_item::{self, Entity as ExpectedItemEntity},
        received_item::{self, Entity as ReceivedItemEntity},
        shipment::{self, Entity as ShipmentEntity, ShipmentStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::{self, LedgerRecord},
};

/// A single physical scan reported by a device.
#[derive(Debug, Clone)]
pub struct ScanEvent {
    pub upc: String,
    pub document_id: Option<String>,
    /// Units scanned in this event; always a positive delta
    pub delta_qty: i64,
    pub device_id: String,
    pub username: Option<String>,
    pub name: Option<String>,
}

/// The merge engine: reconciles concurrent per-device scan reports into one
/// authoritative ledger record per `(upc, document)` key.
///
/// The quantity increment is executed as a conflict-target upsert so the
/// read-modify-write race between two devices scanning the same key is
/// closed by the store, not by this service. Provenance columns are merged
/// in the same transaction; attribution is informational and last write
/// wins there.
#[derive(Clone)]
pub struct ReconciliationService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl ReconciliationService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Applies one additive scan to the ledger.
    ///
    /// Non-idempotent by contract: a retried call for the same physical scan
    /// double-counts. Deduplication by a client-generated event id is the
    /// caller's responsibility.
    #[instrument(skip(self, scan), fields(upc = %scan.upc, device_id = %scan.device_id))]
    pub async fn apply_scan(
        &self,
        shipment_id: &str,
        scan: ScanEvent,
    ) -> Result<LedgerRecord, ServiceError> {
        if scan.delta_qty <= 0 {
            return Err(ServiceError::InvalidInput(
                "Scan quantity must be a positive integer".to_string(),
            ));
        }
        if scan.upc.trim().is_empty() {
            return Err(ServiceError::InvalidInput("UPC must not be empty".to_string()));
        }

        let db = &*self.db;
        let txn = db.begin().await.map_err(ServiceError::DatabaseError)?;
        Self::mutable_shipment_guard(&txn, shipment_id).await?;

        let document_id = models::document_id_to_storage(scan.document_id.as_deref());
        let now = models::now_millis();

        // Store-native atomic increment: two concurrent scans of the same key
        // must both land, so the addition happens inside the upsert instead of
        // an application-level read-then-write.
        let insert = received_item::ActiveModel {
            shipment_id: Set(shipment_id.to_string()),
            upc: Set(scan.upc.clone()),
            document_id: Set(document_id.clone()),
            qty_received: Set(scan.delta_qty),
            scanned_by: Set(models::encode_device_set(std::slice::from_ref(
                &scan.device_id,
            ))),
            scanned_by_username: Set(scan.username.clone()),
            scanned_by_name: Set(scan.name.clone()),
            last_updated: Set(now),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        ReceivedItemEntity::insert(insert)
            .on_conflict(
                OnConflict::columns([
                    received_item::Column::ShipmentId,
                    received_item::Column::Upc,
                    received_item::Column::DocumentId,
                ])
                .value(
                    received_item::Column::QtyReceived,
                    Expr::col(received_item::Column::QtyReceived).add(scan.delta_qty),
                )
                .value(received_item::Column::LastUpdated, Expr::value(now))
                .to_owned(),
            )
            .exec_without_returning(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let row = Self::find_row(&txn, shipment_id, &scan.upc, &document_id)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError("Ledger record missing after upsert".to_string())
            })?;

        // Merge provenance: the device set accumulates, the display identity
        // reflects the latest contributor.
        let mut devices = models::decode_device_set(&row.scanned_by);
        if !devices.contains(&scan.device_id) {
            devices.push(scan.device_id.clone());
        }
        let mut active: received_item::ActiveModel = row.into();
        active.scanned_by = Set(models::encode_device_set(&devices));
        active.scanned_by_username = Set(scan.username.clone());
        active.scanned_by_name = Set(scan.name.clone());
        let row = active
            .update(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let qty_expected =
            Self::expected_qty_for_key(&txn, shipment_id, &row.upc, &document_id).await?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        self.event_sender
            .send_or_log(Event::ScanApplied {
                shipment_id: shipment_id.to_string(),
                upc: scan.upc.clone(),
                delta_qty: scan.delta_qty,
                device_id: scan.device_id.clone(),
            })
            .await;
        info!(
            shipment_id,
            upc = %scan.upc,
            delta_qty = scan.delta_qty,
            "Scan applied"
        );

        Ok(LedgerRecord::from_row(row, qty_expected))
    }

    /// Overwrites the received quantity for one key. A manual correction,
    /// not a physical scan: provenance is left untouched.
    #[instrument(skip(self))]
    pub async fn set_quantity(
        &self,
        shipment_id: &str,
        upc: &str,
        document_id: Option<&str>,
        absolute_qty: i64,
    ) -> Result<LedgerRecord, ServiceError> {
        if absolute_qty < 0 {
            return Err(ServiceError::InvalidInput(
                "Corrected quantity must be non-negative".to_string(),
            ));
        }
        if upc.trim().is_empty() {
            return Err(ServiceError::InvalidInput("UPC must not be empty".to_string()));
        }

        let db = &*self.db;
        let txn = db.begin().await.map_err(ServiceError::DatabaseError)?;
        Self::mutable_shipment_guard(&txn, shipment_id).await?;

        let doc_storage = models::document_id_to_storage(document_id);
        let now = models::now_millis();

        let row = match Self::find_row(&txn, shipment_id, upc, &doc_storage).await? {
            Some(existing) => {
                let mut active: received_item::ActiveModel = existing.into();
                active.qty_received = Set(absolute_qty);
                active.last_updated = Set(now);
                active
                    .update(&txn)
                    .await
                    .map_err(ServiceError::DatabaseError)?
            }
            None => {
                let active = received_item::ActiveModel {
                    shipment_id: Set(shipment_id.to_string()),
                    upc: Set(upc.to_string()),
                    document_id: Set(doc_storage.clone()),
                    qty_received: Set(absolute_qty),
                    scanned_by: Set("[]".to_string()),
                    scanned_by_username: Set(None),
                    scanned_by_name: Set(None),
                    last_updated: Set(now),
                    created_at: Set(Utc::now()),
                    ..Default::default()
                };
                active
                    .insert(&txn)
                    .await
                    .map_err(ServiceError::DatabaseError)?
            }
        };

        let qty_expected =
            Self::expected_qty_for_key(&txn, shipment_id, upc, &doc_storage).await?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        self.event_sender
            .send_or_log(Event::QuantityCorrected {
                shipment_id: shipment_id.to_string(),
                upc: upc.to_string(),
                absolute_qty,
            })
            .await;

        Ok(LedgerRecord::from_row(row, qty_expected))
    }

    /// Replaces the server record for each key with the client's value.
    ///
    /// Last-writer-wins per key, applied in sequence order, so a later
    /// duplicate key inside the batch wins. A single device's local ledger
    /// is already internally consistent; this trades strict cross-device
    /// conflict resolution for one write per upload.
    #[instrument(skip(self, records), fields(record_count = records.len()))]
    pub async fn batch_merge(
        &self,
        shipment_id: &str,
        records: Vec<LedgerRecord>,
    ) -> Result<usize, ServiceError> {
        let db = &*self.db;
        let txn = db.begin().await.map_err(ServiceError::DatabaseError)?;
        Self::mutable_shipment_guard(&txn, shipment_id).await?;

        let now = models::now_millis();
        let mut processed = 0usize;

        for record in &records {
            if record.upc.trim().is_empty() {
                return Err(ServiceError::InvalidInput(
                    "Batch record without a UPC".to_string(),
                ));
            }
            if record.qty_received < 0 {
                return Err(ServiceError::InvalidInput(format!(
                    "Batch record for UPC {} has a negative quantity",
                    record.upc
                )));
            }

            let insert = received_item::ActiveModel {
                shipment_id: Set(shipment_id.to_string()),
                upc: Set(record.upc.clone()),
                document_id: Set(models::document_id_to_storage(
                    record.document_id.as_deref(),
                )),
                qty_received: Set(record.qty_received),
                scanned_by: Set(models::encode_device_set(&record.scanned_by)),
                scanned_by_username: Set(record.scanned_by_username.clone()),
                scanned_by_name: Set(record.scanned_by_name.clone()),
                last_updated: Set(now),
                created_at: Set(Utc::now()),
                ..Default::default()
            };

            ReceivedItemEntity::insert(insert)
                .on_conflict(
                    OnConflict::columns([
                        received_item::Column::ShipmentId,
                        received_item::Column::Upc,
                        received_item::Column::DocumentId,
                    ])
                    .update_columns([
                        received_item::Column::QtyReceived,
                        received_item::Column::ScannedBy,
                        received_item::Column::ScannedByUsername,
                        received_item::Column::ScannedByName,
                        received_item::Column::LastUpdated,
                    ])
                    .to_owned(),
                )
                .exec_without_returning(&txn)
                .await
                .map_err(ServiceError::DatabaseError)?;

            processed += 1;
        }

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        self.event_sender
            .send_or_log(Event::BatchMerged {
                shipment_id: shipment_id.to_string(),
                record_count: processed,
            })
            .await;
        info!(shipment_id, record_count = processed, "Batch merged");

        Ok(processed)
    }

    /// Full ledger fetch in creation order. Reads are allowed on completed
    /// shipments.
    #[instrument(skip(self))]
    pub async fn pull_all(&self, shipment_id: &str) -> Result<Vec<LedgerRecord>, ServiceError> {
        self.pull_since(shipment_id, 0).await
    }

    /// Records with `last_updated > since`, creation order. `since = 0`
    /// returns the full ledger. Idempotent and safe to call repeatedly.
    #[instrument(skip(self))]
    pub async fn pull_since(
        &self,
        shipment_id: &str,
        since: i64,
    ) -> Result<Vec<LedgerRecord>, ServiceError> {
        let db = &*self.db;

        ShipmentEntity::find_by_id(shipment_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Shipment {} not found", shipment_id))
            })?;

        let mut query = ReceivedItemEntity::find()
            .filter(received_item::Column::ShipmentId.eq(shipment_id));
        if since > 0 {
            query = query.filter(received_item::Column::LastUpdated.gt(since));
        }
        let rows = query
            .order_by_asc(received_item::Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let expected = Self::expected_qty_map(db, shipment_id).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let qty_expected = expected
                    .get(&(row.upc.clone(), row.document_id.clone()))
                    .copied()
                    .unwrap_or(0);
                LedgerRecord::from_row(row, qty_expected)
            })
            .collect())
    }

    /// Expected quantities for every manifest key of a shipment. Multiple
    /// manifest lines for the same key accumulate.
    pub async fn expected_qty_map<C: ConnectionTrait>(
        conn: &C,
        shipment_id: &str,
    ) -> Result<HashMap<(String, String), i64>, ServiceError> {
        let lines = ExpectedItemEntity::find()
            .filter(expected_item::Column::ShipmentId.eq(shipment_id))
            .all(conn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let mut map: HashMap<(String, String), i64> = HashMap::new();
        for line in lines {
            *map.entry((line.upc, line.document_id)).or_insert(0) += line.qty_expected;
        }
        Ok(map)
    }

    async fn expected_qty_for_key<C: ConnectionTrait>(
        conn: &C,
        shipment_id: &str,
        upc: &str,
        document_id: &str,
    ) -> Result<i64, ServiceError> {
        let lines = ExpectedItemEntity::find()
            .filter(expected_item::Column::ShipmentId.eq(shipment_id))
            .filter(expected_item::Column::Upc.eq(upc))
            .filter(expected_item::Column::DocumentId.eq(document_id))
            .all(conn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(lines.iter().map(|l| l.qty_expected).sum())
    }

    async fn find_row<C: ConnectionTrait>(
        conn: &C,
        shipment_id: &str,
        upc: &str,
        document_id: &str,
    ) -> Result<Option<received_item::Model>, ServiceError> {
        ReceivedItemEntity::find()
            .filter(received_item::Column::ShipmentId.eq(shipment_id))
            .filter(received_item::Column::Upc.eq(upc))
            .filter(received_item::Column::DocumentId.eq(document_id))
            .one(conn)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Rejects ledger mutation when the shipment is missing or completed.
    /// A completion racing a pending scan resolves here: last check wins.
    async fn mutable_shipment_guard<C: ConnectionTrait>(
        conn: &C,
        shipment_id: &str,
    ) -> Result<shipment::Model, ServiceError> {
        let model = ShipmentEntity::find_by_id(shipment_id)
            .one(conn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Shipment {} not found", shipment_id))
            })?;

        if model.status == ShipmentStatus::Completed {
            return Err(ServiceError::Conflict(format!(
                "Shipment {} is completed",
                shipment_id
            )));
        }

        Ok(model)
    }
}
