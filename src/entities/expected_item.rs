use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One manifest line extracted from the source purchase-order documents.
/// Immutable once the shipment is created.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "expected_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub shipment_id: String,
    pub item_number: String,
    pub legacy_item_number: Option<String>,
    pub description: String,
    pub upc: String,
    pub qty_expected: i64,
    /// Empty string means the line is not tied to a specific document
    pub document_id: String,
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
