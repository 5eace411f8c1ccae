use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Shipment lifecycle status. The transition is one-way: once a shipment is
/// completed the reconciliation engine rejects further ledger mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "kebab-case")]
pub enum ShipmentStatus {
    #[sea_orm(string_value = "in-progress")]
    InProgress,

    #[sea_orm(string_value = "completed")]
    Completed,
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShipmentStatus::InProgress => write!(f, "in-progress"),
            ShipmentStatus::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for ShipmentStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "in-progress" | "in_progress" => Ok(ShipmentStatus::InProgress),
            "completed" => Ok(ShipmentStatus::Completed),
            other => Err(format!("Unknown shipment status '{}'", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "shipments")]
pub struct Model {
    /// Opaque identifier, client-generated (timestamp-based) or server-assigned
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub date: DateTime<Utc>,
    /// Source document identifiers, insertion order, stored as a JSON array
    pub document_ids: String,
    pub status: ShipmentStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Server-clock unix milliseconds of the last metadata write
    pub last_updated: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::expected_item::Entity")]
    ExpectedItems,
    #[sea_orm(has_many = "super::received_item::Entity")]
    ReceivedItems,
}

impl Related<super::expected_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExpectedItems.def()
    }
}

impl Related<super::received_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReceivedItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
