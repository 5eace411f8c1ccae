use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Domain events emitted by the services after a successful write.
/// Consumers are in-process only; delivery is best-effort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    ShipmentCreated {
        shipment_id: String,
    },
    ShipmentCompleted {
        shipment_id: String,
    },
    ShipmentDeleted {
        shipment_id: String,
        records_removed: u64,
    },
    ScanApplied {
        shipment_id: String,
        upc: String,
        delta_qty: i64,
        device_id: String,
    },
    QuantityCorrected {
        shipment_id: String,
        upc: String,
        absolute_qty: i64,
    },
    BatchMerged {
        shipment_id: String,
        record_count: usize,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the consumer is gone.
    /// Event delivery must never fail a write that already committed.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(err) = self.send(event).await {
            warn!("Event dropped: {}", err);
        }
    }
}

/// Drains the event channel, logging each event. Runs for the lifetime of
/// the server; exits when every sender is dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        debug!(?event, "Processing event");
    }
    debug!("Event channel closed; processor exiting");
}

/// Convenience constructor for an event pipeline with a logging consumer.
pub fn event_channel(buffer: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(buffer);
    (EventSender::new(tx), rx)
}
