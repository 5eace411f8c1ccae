//! Pure discrepancy arithmetic over the expected manifest and the received
//! ledger. No storage access: callers hand in both sides and get back a
//! combined view in which every `(upc, document)` key appears exactly once.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::models::{ExpectedItemPayload, LedgerRecord, RecordKey};

/// `received - expected`: positive is overage, negative is shortage.
pub fn discrepancy(qty_received: i64, qty_expected: i64) -> i64 {
    qty_received - qty_expected
}

/// One line of the combined expected+received view.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiscrepancyLine {
    pub upc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub qty_expected: i64,
    pub qty_received: i64,
    pub discrepancy: i64,
}

/// Shipment-level aggregates over the combined view.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentReport {
    pub lines: Vec<DiscrepancyLine>,
    pub total_expected: i64,
    pub total_received: i64,
    /// Count of lines received over expectation
    pub overages: usize,
    /// Count of lines received under expectation (including never scanned)
    pub shortages: usize,
    /// Count of lines received exactly as expected
    pub matches: usize,
}

impl ShipmentReport {
    pub fn total_discrepancy(&self) -> i64 {
        self.total_received - self.total_expected
    }
}

/// Combines every expected item with every ledger record.
///
/// Expected items never scanned appear as shortage lines at
/// `qty_received = 0`; ledger records with no manifest counterpart appear as
/// pure overage at `qty_expected = 0`. Manifest lines sharing a key
/// accumulate their expected quantities.
pub fn build_report(expected: &[ExpectedItemPayload], received: &[LedgerRecord]) -> ShipmentReport {
    struct Line {
        description: Option<String>,
        qty_expected: i64,
        qty_received: i64,
    }

    // BTreeMap keeps the combined view deterministically ordered by key.
    let mut combined: BTreeMap<RecordKey, Line> = BTreeMap::new();

    for item in expected {
        let key = RecordKey::new(item.upc.clone(), item.document_id.clone());
        let entry = combined.entry(key).or_insert(Line {
            description: Some(item.description.clone()),
            qty_expected: 0,
            qty_received: 0,
        });
        entry.qty_expected += item.qty_expected;
        if entry.description.is_none() {
            entry.description = Some(item.description.clone());
        }
    }

    for record in received {
        let entry = combined.entry(record.key()).or_insert(Line {
            description: None,
            qty_expected: 0,
            qty_received: 0,
        });
        entry.qty_received = record.qty_received;
    }

    let mut report = ShipmentReport::default();
    for (key, line) in combined {
        let diff = discrepancy(line.qty_received, line.qty_expected);
        report.total_expected += line.qty_expected;
        report.total_received += line.qty_received;
        match diff {
            d if d > 0 => report.overages += 1,
            d if d < 0 => report.shortages += 1,
            _ => report.matches += 1,
        }
        report.lines.push(DiscrepancyLine {
            upc: key.upc,
            document_id: key.document_id,
            description: line.description,
            qty_expected: line.qty_expected,
            qty_received: line.qty_received,
            discrepancy: diff,
        });
    }

    report
}
