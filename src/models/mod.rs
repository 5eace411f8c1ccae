//! Normalized domain shapes shared by the engine, the HTTP surface, and the
//! client sync tier.
//!
//! The storage layer keeps two denormalized encodings: "no document" is the
//! empty string (so the composite unique key behaves under SQL NULL
//! semantics) and the contributing-device set is a JSON array in a text
//! column. Both translations live here, at the adapter boundary; the
//! reconciliation engine itself only ever sees one `LedgerRecord` shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::entities::{expected_item, received_item, shipment};

/// The unit of reconciliation: the same UPC under two different documents is
/// two independent ledger records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub upc: String,
    pub document_id: Option<String>,
}

impl RecordKey {
    pub fn new(upc: impl Into<String>, document_id: Option<String>) -> Self {
        Self {
            upc: upc.into(),
            document_id: document_id.filter(|d| !d.is_empty()),
        }
    }
}

/// Translate an optional document id to its storage encoding.
pub fn document_id_to_storage(document_id: Option<&str>) -> String {
    document_id.unwrap_or_default().to_string()
}

/// Translate the storage encoding back to the API shape.
pub fn document_id_from_storage(document_id: &str) -> Option<String> {
    if document_id.is_empty() {
        None
    } else {
        Some(document_id.to_string())
    }
}

/// Decode the stored device set. Unparseable history degrades to empty
/// rather than failing a read path.
pub fn decode_device_set(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

pub fn encode_device_set(devices: &[String]) -> String {
    serde_json::to_string(devices).unwrap_or_else(|_| "[]".to_string())
}

pub fn decode_document_ids(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

pub fn encode_document_ids(ids: &[String]) -> String {
    serde_json::to_string(ids).unwrap_or_else(|_| "[]".to_string())
}

/// Current server clock in unix milliseconds. All `lastUpdated` bookkeeping
/// and the delta-sync watermark use this timebase.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// One manifest line as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "itemNumber": "100342",
    "legacyItemNumber": "A-2231",
    "description": "3/4in copper elbow",
    "upc": "036000291452",
    "qtyExpected": 100,
    "documentId": "PO-10021"
}))]
pub struct ExpectedItemPayload {
    pub item_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_item_number: Option<String>,
    pub description: String,
    pub upc: String,
    pub qty_expected: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
}

impl From<expected_item::Model> for ExpectedItemPayload {
    fn from(model: expected_item::Model) -> Self {
        Self {
            item_number: model.item_number,
            legacy_item_number: model.legacy_item_number,
            description: model.description,
            upc: model.upc,
            qty_expected: model.qty_expected,
            document_id: document_id_from_storage(&model.document_id),
        }
    }
}

/// The reconciled received-quantity state for one record key, as served to
/// clients. `discrepancy` is always derived (`qtyReceived - qtyExpected`),
/// never read back from storage.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "upc": "036000291452",
    "documentId": "PO-10021",
    "qtyReceived": 70,
    "qtyExpected": 100,
    "discrepancy": -30,
    "scannedBy": ["device-a81f", "device-c90d"],
    "scannedByUsername": "mreyes",
    "scannedByName": "M. Reyes",
    "lastUpdated": 1714060000123i64
}))]
pub struct LedgerRecord {
    pub upc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    pub qty_received: i64,
    #[serde(default)]
    pub qty_expected: i64,
    #[serde(default)]
    pub discrepancy: i64,
    #[serde(default)]
    pub scanned_by: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scanned_by_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scanned_by_name: Option<String>,
    #[serde(default)]
    pub last_updated: i64,
}

impl LedgerRecord {
    /// Build the normalized record from a storage row plus the expected
    /// quantity resolved for its key.
    pub fn from_row(row: received_item::Model, qty_expected: i64) -> Self {
        Self {
            upc: row.upc,
            document_id: document_id_from_storage(&row.document_id),
            qty_received: row.qty_received,
            qty_expected,
            discrepancy: row.qty_received - qty_expected,
            scanned_by: decode_device_set(&row.scanned_by),
            scanned_by_username: row.scanned_by_username,
            scanned_by_name: row.scanned_by_name,
            last_updated: row.last_updated,
        }
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.upc.clone(), self.document_id.clone())
    }
}

/// Shipment metadata as listed by `GET /shipments`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentSummary {
    pub id: String,
    pub date: DateTime<Utc>,
    pub document_ids: Vec<String>,
    /// `in-progress` or `completed`
    pub status: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub last_updated: i64,
}

impl From<shipment::Model> for ShipmentSummary {
    fn from(model: shipment::Model) -> Self {
        Self {
            id: model.id,
            date: model.date,
            document_ids: decode_document_ids(&model.document_ids),
            status: model.status.to_string(),
            created_at: model.created_at,
            completed_at: model.completed_at,
            last_updated: model.last_updated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_id_round_trip() {
        assert_eq!(document_id_to_storage(None), "");
        assert_eq!(document_id_to_storage(Some("PO-1")), "PO-1");
        assert_eq!(document_id_from_storage(""), None);
        assert_eq!(document_id_from_storage("PO-1"), Some("PO-1".to_string()));
    }

    #[test]
    fn record_key_normalizes_empty_document() {
        let a = RecordKey::new("123", None);
        let b = RecordKey::new("123", Some(String::new()));
        assert_eq!(a, b);
    }

    #[test]
    fn device_set_decoding_tolerates_garbage() {
        assert_eq!(
            decode_device_set(r#"["a","b"]"#),
            vec!["a".to_string(), "b".to_string()]
        );
        assert!(decode_device_set("not json").is_empty());
    }

    #[test]
    fn ledger_record_derives_discrepancy() {
        let row = received_item::Model {
            id: 1,
            shipment_id: "s1".into(),
            upc: "123".into(),
            document_id: String::new(),
            qty_received: 70,
            scanned_by: r#"["device-a"]"#.into(),
            scanned_by_username: None,
            scanned_by_name: None,
            last_updated: 5,
            created_at: Utc::now(),
        };
        let record = LedgerRecord::from_row(row, 100);
        assert_eq!(record.discrepancy, -30);
        assert_eq!(record.document_id, None);
        assert_eq!(record.scanned_by, vec!["device-a".to_string()]);
    }
}
