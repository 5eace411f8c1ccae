use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
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
    models::{self, ExpectedItemPayload},
};

/// Fields a client may supply when upserting shipment metadata.
#[derive(Debug, Clone, Default)]
pub struct ShipmentUpsert {
    pub date: Option<DateTime<Utc>>,
    pub document_ids: Vec<String>,
    pub expected_items: Vec<ExpectedItemPayload>,
}

/// Service owning the shipment lifecycle: metadata upsert, completion, and
/// cascade deletion. The received-item ledger itself belongs to the
/// reconciliation service.
#[derive(Clone)]
pub struct ShipmentService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl ShipmentService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Create-or-update shipment metadata.
    ///
    /// The expected-item manifest is written only on create; it is immutable
    /// for the life of the shipment, so a later upsert touches metadata only.
    /// Completed shipments reject the write entirely.
    #[instrument(skip(self, input))]
    pub async fn upsert_shipment(
        &self,
        shipment_id: &str,
        input: ShipmentUpsert,
    ) -> Result<shipment::Model, ServiceError> {
        if shipment_id.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "Shipment id must not be empty".to_string(),
            ));
        }

        let db = &*self.db;
        let txn = db.begin().await.map_err(ServiceError::DatabaseError)?;

        let existing = ShipmentEntity::find_by_id(shipment_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let now = Utc::now();
        let now_ms = models::now_millis();

        let (model, created) = match existing {
            Some(current) => {
                if current.status == ShipmentStatus::Completed {
                    return Err(ServiceError::Conflict(format!(
                        "Shipment {} is completed",
                        shipment_id
                    )));
                }

                let mut active: shipment::ActiveModel = current.into();
                if let Some(date) = input.date {
                    active.date = Set(date);
                }
                if !input.document_ids.is_empty() {
                    active.document_ids = Set(models::encode_document_ids(&input.document_ids));
                }
                active.last_updated = Set(now_ms);

                let updated = active
                    .update(&txn)
                    .await
                    .map_err(ServiceError::DatabaseError)?;
                (updated, false)
            }
            None => {
                let active = shipment::ActiveModel {
                    id: Set(shipment_id.to_string()),
                    date: Set(input.date.unwrap_or(now)),
                    document_ids: Set(models::encode_document_ids(&input.document_ids)),
                    status: Set(ShipmentStatus::InProgress),
                    created_at: Set(now),
                    completed_at: Set(None),
                    last_updated: Set(now_ms),
                };

                let inserted = active
                    .insert(&txn)
                    .await
                    .map_err(ServiceError::DatabaseError)?;

                for item in &input.expected_items {
                    if item.qty_expected < 0 {
                        return Err(ServiceError::InvalidInput(format!(
                            "Expected quantity for UPC {} must be non-negative",
                            item.upc
                        )));
                    }
                    let line = expected_item::ActiveModel {
                        shipment_id: Set(shipment_id.to_string()),
                        item_number: Set(item.item_number.clone()),
                        legacy_item_number: Set(item.legacy_item_number.clone()),
                        description: Set(item.description.clone()),
                        upc: Set(item.upc.clone()),
                        qty_expected: Set(item.qty_expected),
                        document_id: Set(models::document_id_to_storage(
                            item.document_id.as_deref(),
                        )),
                        ..Default::default()
                    };
                    line.insert(&txn)
                        .await
                        .map_err(ServiceError::DatabaseError)?;
                }

                (inserted, true)
            }
        };

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        if created {
            self.event_sender
                .send_or_log(Event::ShipmentCreated {
                    shipment_id: shipment_id.to_string(),
                })
                .await;
            info!(
                shipment_id,
                expected_items = input.expected_items.len(),
                "Shipment created"
            );
        }

        Ok(model)
    }

    /// Gets a shipment with its manifest
    #[instrument(skip(self))]
    pub async fn get_shipment(
        &self,
        shipment_id: &str,
    ) -> Result<Option<(shipment::Model, Vec<expected_item::Model>)>, ServiceError> {
        let db = &*self.db;
        let Some(model) = ShipmentEntity::find_by_id(shipment_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
        else {
            return Ok(None);
        };

        let manifest = ExpectedItemEntity::find()
            .filter(expected_item::Column::ShipmentId.eq(shipment_id))
            .order_by_asc(expected_item::Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(Some((model, manifest)))
    }

    /// Lists all shipments, newest-created first
    #[instrument(skip(self))]
    pub async fn list_shipments(&self) -> Result<Vec<shipment::Model>, ServiceError> {
        let db = &*self.db;
        ShipmentEntity::find()
            .order_by_desc(shipment::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Transitions a shipment to `completed`. One-way: the ledger refuses
    /// mutation afterwards. Completing an already-completed shipment is an
    /// idempotent success so client retries stay cheap.
    #[instrument(skip(self))]
    pub async fn complete_shipment(
        &self,
        shipment_id: &str,
    ) -> Result<shipment::Model, ServiceError> {
        let db = &*self.db;
        let model = ShipmentEntity::find_by_id(shipment_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Shipment {} not found", shipment_id))
            })?;

        if model.status == ShipmentStatus::Completed {
            return Ok(model);
        }

        let mut active: shipment::ActiveModel = model.into();
        active.status = Set(ShipmentStatus::Completed);
        active.completed_at = Set(Some(Utc::now()));
        active.last_updated = Set(models::now_millis());

        let updated = active.update(db).await.map_err(ServiceError::DatabaseError)?;

        self.event_sender
            .send_or_log(Event::ShipmentCompleted {
                shipment_id: shipment_id.to_string(),
            })
            .await;
        info!(shipment_id, "Shipment completed");

        Ok(updated)
    }

    /// Deletes a shipment and cascades to its manifest and ledger records.
    #[instrument(skip(self))]
    pub async fn delete_shipment(&self, shipment_id: &str) -> Result<u64, ServiceError> {
        let db = &*self.db;
        let txn = db.begin().await.map_err(ServiceError::DatabaseError)?;

        let existing = ShipmentEntity::find_by_id(shipment_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Shipment {} not found", shipment_id))
            })?;

        let removed = ReceivedItemEntity::delete_many()
            .filter(received_item::Column::ShipmentId.eq(shipment_id))
            .exec(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .rows_affected;

        ExpectedItemEntity::delete_many()
            .filter(expected_item::Column::ShipmentId.eq(shipment_id))
            .exec(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let active: shipment::ActiveModel = existing.into();
        active
            .delete(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        self.event_sender
            .send_or_log(Event::ShipmentDeleted {
                shipment_id: shipment_id.to_string(),
                records_removed: removed,
            })
            .await;
        info!(shipment_id, records_removed = removed, "Shipment deleted");

        Ok(removed)
    }
}
