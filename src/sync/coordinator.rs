//! Orchestrates the three sync motions a device performs: eager scan push,
//! batch replay after an offline stretch, and watermark-based delta pulls.

use tracing::{debug, instrument, warn};

use crate::errors::ServiceError;
use crate::models::RecordKey;
use crate::sync::local::{DeviceIdentity, LedgerAction, LocalLedger};
use crate::sync::transport::{ScanUpload, SyncTransport};

pub struct SyncCoordinator<T: SyncTransport> {
    transport: T,
    ledger: LocalLedger,
    shipment_id: String,
    last_sync: i64,
}

impl<T: SyncTransport> SyncCoordinator<T> {
    pub fn new(transport: T, identity: DeviceIdentity, shipment_id: impl Into<String>) -> Self {
        Self {
            transport,
            ledger: LocalLedger::new(identity),
            shipment_id: shipment_id.into(),
            last_sync: 0,
        }
    }

    pub fn ledger(&self) -> &LocalLedger {
        &self.ledger
    }

    pub fn last_sync(&self) -> i64 {
        self.last_sync
    }

    /// Record a scan locally and push it to the server. The local ledger is
    /// updated first so the UI never waits on the network; a failed push
    /// leaves the key dirty for the next batch replay.
    #[instrument(skip(self), fields(shipment_id = %self.shipment_id))]
    pub async fn record_scan(&mut self, key: RecordKey, delta_qty: i64) {
        self.ledger.apply(LedgerAction::ScanRecorded {
            key: key.clone(),
            delta_qty,
        });

        let identity = self.ledger.identity().clone();
        let scan = ScanUpload {
            upc: key.upc.clone(),
            qty_received: delta_qty,
            document_id: key.document_id.clone(),
            device_id: identity.device_id,
            username: identity.username,
            name: identity.name,
        };

        match self.transport.push_scan(&self.shipment_id, scan).await {
            Ok(item) => {
                debug!(upc = %key.upc, qty = item.qty_received, "scan acknowledged");
                self.ledger.acknowledge(item);
            }
            Err(e) => {
                warn!(upc = %key.upc, error = %e, "scan push failed, queued for replay");
            }
        }
    }

    /// Replay every unacknowledged record to the server in one batch.
    #[instrument(skip(self), fields(shipment_id = %self.shipment_id))]
    pub async fn replay_offline_scans(&mut self) -> Result<usize, ServiceError> {
        let pending = self.ledger.dirty_records();
        if pending.is_empty() {
            return Ok(0);
        }

        let count = self
            .transport
            .upload_batch(&self.shipment_id, pending)
            .await?;
        self.ledger.mark_synced();
        debug!(count, "offline scans replayed");
        Ok(count)
    }

    /// Pull records changed since the last sync and merge them in. Advances
    /// the watermark to the server clock from the response.
    #[instrument(skip(self), fields(shipment_id = %self.shipment_id))]
    pub async fn pull_and_merge(&mut self) -> Result<usize, ServiceError> {
        let delta = self
            .transport
            .pull_since(&self.shipment_id, self.last_sync)
            .await?;

        let merged = delta.items.len();
        self.ledger.apply(LedgerAction::ServerMerged {
            records: delta.items,
        });
        self.last_sync = delta.server_time;
        debug!(merged, watermark = self.last_sync, "server delta merged");
        Ok(merged)
    }
}
