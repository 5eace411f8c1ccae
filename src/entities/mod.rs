pub mod expected_item;
pub mod received_item;
pub mod shipment;
