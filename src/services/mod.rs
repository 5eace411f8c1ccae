pub mod discrepancy;
pub mod manifest;
pub mod reconciliation;
pub mod shipments;
