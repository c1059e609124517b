// Stock primitives
pub mod allocation;
pub mod free_goods;
pub mod inventory_ledger;
pub mod sequence;

// Read-only lookups
pub mod master_data;

// Workflows
pub mod collections;
pub mod deliveries;
pub mod deposits;
pub mod inventory;
pub mod order_lifecycle;
pub mod transfers;
