//! Single-writer local ledger kept on a device.
//!
//! All mutations funnel through [`LocalLedger::apply`], so concurrent UI and
//! network callers only need to serialize access to the ledger itself. The
//! server copy is authoritative for quantities; local state exists to keep
//! the device usable offline and to feed the batch replay.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{now_millis, LedgerRecord, RecordKey};

/// Who this device is. Stamped onto every locally recorded scan.
#[derive(Debug, Clone)]
pub struct DeviceIdentity {
    pub device_id: String,
    pub username: Option<String>,
    pub name: Option<String>,
}

impl DeviceIdentity {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            username: None,
            name: None,
        }
    }

    pub fn with_operator(
        mut self,
        username: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.name = Some(name.into());
        self
    }
}

/// A mutation applied to the local ledger.
#[derive(Debug, Clone)]
pub enum LedgerAction {
    /// A unit was physically scanned: add `delta_qty` to the key's count.
    ScanRecorded {
        key: RecordKey,
        delta_qty: i64,
    },
    /// Manual correction: overwrite the key's count.
    QuantityCorrected {
        key: RecordKey,
        qty_received: i64,
    },
    /// A server pull landed. The server wins for every key it reports;
    /// only local records with no server counterpart are preserved.
    ServerMerged {
        records: Vec<LedgerRecord>,
    },
}

#[derive(Debug, Clone)]
pub struct LocalLedger {
    identity: DeviceIdentity,
    records: BTreeMap<RecordKey, LedgerRecord>,
    /// Keys with local mutations the server has not acknowledged.
    dirty: BTreeSet<RecordKey>,
}

impl LocalLedger {
    pub fn new(identity: DeviceIdentity) -> Self {
        Self {
            identity,
            records: BTreeMap::new(),
            dirty: BTreeSet::new(),
        }
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn records(&self) -> impl Iterator<Item = &LedgerRecord> {
        self.records.values()
    }

    pub fn get(&self, key: &RecordKey) -> Option<&LedgerRecord> {
        self.records.get(key)
    }

    pub fn is_dirty(&self, key: &RecordKey) -> bool {
        self.dirty.contains(key)
    }

    /// Records still awaiting server acknowledgement, in key order. This is
    /// the payload for a batch replay.
    pub fn dirty_records(&self) -> Vec<LedgerRecord> {
        self.dirty
            .iter()
            .filter_map(|key| self.records.get(key))
            .cloned()
            .collect()
    }

    /// Mark every dirty key as acknowledged after a successful batch upload.
    pub fn mark_synced(&mut self) {
        self.dirty.clear();
    }

    /// Mark one key acknowledged and adopt the server's view of it.
    pub fn acknowledge(&mut self, record: LedgerRecord) {
        let key = record.key();
        self.records.insert(key.clone(), record);
        self.dirty.remove(&key);
    }

    pub fn apply(&mut self, action: LedgerAction) {
        match action {
            LedgerAction::ScanRecorded { key, delta_qty } => {
                let entry = self.entry(&key);
                entry.qty_received += delta_qty;
                entry.last_updated = now_millis();
                self.dirty.insert(key);
            }
            LedgerAction::QuantityCorrected { key, qty_received } => {
                let entry = self.entry(&key);
                entry.qty_received = qty_received;
                entry.last_updated = now_millis();
                self.dirty.insert(key);
            }
            LedgerAction::ServerMerged { records } => {
                for record in records {
                    let key = record.key();
                    // Server quantity is authoritative once it knows the key,
                    // even over unacknowledged local scans. Keys absent from
                    // the response keep their local state and stay queued.
                    self.records.insert(key.clone(), record);
                    self.dirty.remove(&key);
                }
            }
        }
    }

    fn entry(&mut self, key: &RecordKey) -> &mut LedgerRecord {
        let identity = self.identity.clone();
        let record = self
            .records
            .entry(key.clone())
            .or_insert_with(|| LedgerRecord {
                upc: key.upc.clone(),
                document_id: key.document_id.clone(),
                qty_received: 0,
                qty_expected: 0,
                discrepancy: 0,
                scanned_by: Vec::new(),
                scanned_by_username: identity.username.clone(),
                scanned_by_name: identity.name.clone(),
                last_updated: 0,
            });
        if !record.scanned_by.iter().any(|d| d == &identity.device_id) {
            record.scanned_by.push(identity.device_id);
        }
        record.scanned_by_username = identity.username;
        record.scanned_by_name = identity.name;
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> DeviceIdentity {
        DeviceIdentity::new("device-a").with_operator("mreyes", "M. Reyes")
    }

    fn server_record(upc: &str, qty: i64) -> LedgerRecord {
        LedgerRecord {
            upc: upc.into(),
            document_id: None,
            qty_received: qty,
            qty_expected: 10,
            discrepancy: qty - 10,
            scanned_by: vec!["device-b".into()],
            scanned_by_username: None,
            scanned_by_name: None,
            last_updated: 99,
        }
    }

    #[test]
    fn scans_accumulate_and_stamp_identity() {
        let mut ledger = LocalLedger::new(device());
        let key = RecordKey::new("123", None);
        ledger.apply(LedgerAction::ScanRecorded {
            key: key.clone(),
            delta_qty: 2,
        });
        ledger.apply(LedgerAction::ScanRecorded {
            key: key.clone(),
            delta_qty: 3,
        });

        let record = ledger.get(&key).unwrap();
        assert_eq!(record.qty_received, 5);
        assert_eq!(record.scanned_by, vec!["device-a".to_string()]);
        assert_eq!(record.scanned_by_username.as_deref(), Some("mreyes"));
        assert!(ledger.is_dirty(&key));
    }

    #[test]
    fn correction_overwrites_instead_of_adding() {
        let mut ledger = LocalLedger::new(device());
        let key = RecordKey::new("123", Some("PO-1".into()));
        ledger.apply(LedgerAction::ScanRecorded {
            key: key.clone(),
            delta_qty: 7,
        });
        ledger.apply(LedgerAction::QuantityCorrected {
            key: key.clone(),
            qty_received: 4,
        });
        assert_eq!(ledger.get(&key).unwrap().qty_received, 4);
    }

    #[test]
    fn server_merge_wins_for_every_reported_key() {
        let mut ledger = LocalLedger::new(device());
        let reported = RecordKey::new("111", None);
        let local_only = RecordKey::new("222", None);

        ledger.apply(LedgerAction::ScanRecorded {
            key: reported.clone(),
            delta_qty: 6,
        });
        ledger.apply(LedgerAction::ScanRecorded {
            key: local_only.clone(),
            delta_qty: 3,
        });

        ledger.apply(LedgerAction::ServerMerged {
            records: vec![server_record("111", 9)],
        });

        // The server quantity replaces the pending local count and the key
        // leaves the replay queue.
        assert_eq!(ledger.get(&reported).unwrap().qty_received, 9);
        assert!(!ledger.is_dirty(&reported));

        // A key the server has never seen keeps its local state and stays
        // queued for replay.
        assert_eq!(ledger.get(&local_only).unwrap().qty_received, 3);
        assert!(ledger.is_dirty(&local_only));
    }

    #[test]
    fn acknowledge_adopts_server_state_and_clears_dirty() {
        let mut ledger = LocalLedger::new(device());
        let key = RecordKey::new("111", None);
        ledger.apply(LedgerAction::ScanRecorded {
            key: key.clone(),
            delta_qty: 1,
        });

        ledger.acknowledge(server_record("111", 40));
        assert!(!ledger.is_dirty(&key));
        assert_eq!(ledger.get(&key).unwrap().qty_received, 40);
        assert!(ledger.dirty_records().is_empty());
    }
}
