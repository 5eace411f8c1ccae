use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use receiving_api::errors::ServiceError;
use receiving_api::models::{LedgerRecord, RecordKey};
use receiving_api::sync::transport::{PulledDelta, ScanUpload, SyncTransport};
use receiving_api::sync::{DeviceIdentity, SyncCoordinator};

/// In-memory stand-in for the server: a keyed ledger plus an online switch
/// to simulate connectivity loss.
#[derive(Default)]
struct FakeServer {
    records: Mutex<HashMap<(String, Option<String>), LedgerRecord>>,
    offline: AtomicBool,
    clock: Mutex<i64>,
}

impl FakeServer {
    fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), ServiceError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(ServiceError::ExternalServiceError(
                "connection refused".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    fn tick(&self) -> i64 {
        let mut clock = self.clock.lock().unwrap();
        *clock += 1;
        *clock
    }

    fn insert(&self, record: LedgerRecord) {
        self.records
            .lock()
            .unwrap()
            .insert((record.upc.clone(), record.document_id.clone()), record);
    }
}

#[async_trait]
impl SyncTransport for FakeServer {
    async fn push_scan(
        &self,
        _shipment_id: &str,
        scan: ScanUpload,
    ) -> Result<LedgerRecord, ServiceError> {
        self.check_online()?;
        let now = self.tick();
        let mut records = self.records.lock().unwrap();
        let key = (scan.upc.clone(), scan.document_id.clone());
        let record = records.entry(key).or_insert_with(|| LedgerRecord {
            upc: scan.upc.clone(),
            document_id: scan.document_id.clone(),
            qty_received: 0,
            qty_expected: 0,
            discrepancy: 0,
            scanned_by: Vec::new(),
            scanned_by_username: None,
            scanned_by_name: None,
            last_updated: 0,
        });
        record.qty_received += scan.qty_received;
        if !record.scanned_by.contains(&scan.device_id) {
            record.scanned_by.push(scan.device_id);
        }
        record.last_updated = now;
        Ok(record.clone())
    }

    async fn upload_batch(
        &self,
        _shipment_id: &str,
        records: Vec<LedgerRecord>,
    ) -> Result<usize, ServiceError> {
        self.check_online()?;
        let now = self.tick();
        let count = records.len();
        for mut record in records {
            record.last_updated = now;
            self.insert(record);
        }
        Ok(count)
    }

    async fn pull_since(
        &self,
        _shipment_id: &str,
        last_sync: i64,
    ) -> Result<PulledDelta, ServiceError> {
        self.check_online()?;
        let items = self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.last_updated > last_sync)
            .cloned()
            .collect();
        Ok(PulledDelta {
            items,
            server_time: *self.clock.lock().unwrap(),
        })
    }
}

fn coordinator(server: &Arc<FakeServer>) -> SyncCoordinator<Arc<FakeServer>> {
    SyncCoordinator::new(
        server.clone(),
        DeviceIdentity::new("device-a").with_operator("mreyes", "M. Reyes"),
        "ship-1",
    )
}

fn server_record(upc: &str, qty: i64, stamp: i64) -> LedgerRecord {
    LedgerRecord {
        upc: upc.to_string(),
        document_id: None,
        qty_received: qty,
        qty_expected: 10,
        discrepancy: qty - 10,
        scanned_by: vec!["device-b".to_string()],
        scanned_by_username: None,
        scanned_by_name: None,
        last_updated: stamp,
    }
}

#[tokio::test]
async fn online_scan_adopts_the_server_record() {
    let server = Arc::new(FakeServer::default());
    let mut coord = coordinator(&server);
    let key = RecordKey::new("111", None);

    coord.record_scan(key.clone(), 3).await;

    // Acknowledged: the local copy reflects the server total and is clean.
    assert_eq!(coord.ledger().get(&key).unwrap().qty_received, 3);
    assert!(!coord.ledger().is_dirty(&key));
    assert!(coord.ledger().dirty_records().is_empty());
}

#[tokio::test]
async fn offline_scans_queue_locally_and_replay_in_batch() {
    let server = Arc::new(FakeServer::default());
    let mut coord = coordinator(&server);
    let key = RecordKey::new("111", None);

    server.set_offline(true);
    coord.record_scan(key.clone(), 2).await;
    coord.record_scan(key.clone(), 3).await;

    // Local state kept counting while the pushes failed.
    assert_eq!(coord.ledger().get(&key).unwrap().qty_received, 5);
    assert!(coord.ledger().is_dirty(&key));
    assert!(server.records.lock().unwrap().is_empty());

    // Replay fails while still offline and the queue survives.
    assert!(coord.replay_offline_scans().await.is_err());
    assert!(coord.ledger().is_dirty(&key));

    server.set_offline(false);
    let replayed = coord.replay_offline_scans().await.unwrap();
    assert_eq!(replayed, 1);
    assert!(!coord.ledger().is_dirty(&key));

    let records = server.records.lock().unwrap();
    assert_eq!(records.get(&("111".to_string(), None)).unwrap().qty_received, 5);
}

#[tokio::test]
async fn pull_merges_server_records_and_advances_the_watermark() {
    let server = Arc::new(FakeServer::default());
    server.insert(server_record("111", 4, server.tick()));
    let mut coord = coordinator(&server);

    let merged = coord.pull_and_merge().await.unwrap();
    assert_eq!(merged, 1);
    assert!(coord.last_sync() > 0);

    let key = RecordKey::new("111", None);
    assert_eq!(coord.ledger().get(&key).unwrap().qty_received, 4);

    // A second pull at the advanced watermark is a no-op.
    let merged = coord.pull_and_merge().await.unwrap();
    assert_eq!(merged, 0);
}

#[tokio::test]
async fn pull_overwrites_server_known_keys_and_keeps_local_only_records() {
    let server = Arc::new(FakeServer::default());
    let mut coord = coordinator(&server);
    let pushed_elsewhere = RecordKey::new("111", None);
    let local_only = RecordKey::new("333", None);

    server.set_offline(true);
    coord.record_scan(pushed_elsewhere.clone(), 6).await;
    coord.record_scan(local_only.clone(), 2).await;
    server.set_offline(false);

    // Another device already pushed "111"; "222" exists only server-side.
    server.insert(server_record("111", 1, server.tick()));
    server.insert(server_record("222", 9, server.tick()));

    coord.pull_and_merge().await.unwrap();

    // Server wins for every key it reports, pending local scans included.
    assert_eq!(
        coord.ledger().get(&pushed_elsewhere).unwrap().qty_received,
        1
    );
    assert_eq!(
        coord
            .ledger()
            .get(&RecordKey::new("222", None))
            .unwrap()
            .qty_received,
        9
    );

    // Only the record the server has never seen survives locally, and only
    // it is left to replay.
    assert_eq!(coord.ledger().get(&local_only).unwrap().qty_received, 2);
    let pending = coord.ledger().dirty_records();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].upc, "333");
}
