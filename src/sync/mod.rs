//! Client-side sync tier for handheld devices.
//!
//! A device keeps a [`local::LocalLedger`] it can mutate offline, and a
//! [`coordinator::SyncCoordinator`] that pushes scans eagerly, replays the
//! local ledger in batch after an offline stretch, and pulls server deltas
//! using the `serverTime` watermark.

pub mod coordinator;
pub mod local;
pub mod transport;

pub use coordinator::SyncCoordinator;
pub use local::{DeviceIdentity, LocalLedger};
pub use transport::{HttpSyncTransport, SyncTransport};
