use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Reconciled ledger row for one `(shipment, upc, document)` key.
///
/// `qty_received` is cumulative: additive under scans, absolute under
/// explicit corrections. `scanned_by` holds every device that ever
/// contributed, as a JSON array; the username/name columns track only the
/// most recent contributor for display. Rows are never deleted individually,
/// only through shipment cascade deletion.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "received_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub shipment_id: String,
    pub upc: String,
    /// Empty string means "no source document" (kept non-null so the unique
    /// reconciliation index matches under SQL NULL semantics)
    pub document_id: String,
    pub qty_received: i64,
    /// JSON array of contributing device ids
    pub scanned_by: String,
    pub scanned_by_username: Option<String>,
    pub scanned_by_name: Option<String>,
    /// Server-clock unix milliseconds of the last write
    pub last_updated: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::shipment::Entity",
        from = "Column::ShipmentId",
        to = "super::shipment::Column::Id"
    )]
    Shipment,
}

impl Related<super::shipment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shipment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
