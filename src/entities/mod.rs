pub mod batch_detail;
pub mod collection_deposit;
pub mod collection_transaction;
pub mod customer;
pub mod delivery;
pub mod delivery_item;
pub mod deposit_receipt;
pub mod depot;
pub mod depot_transfer;
pub mod depot_transfer_item;
pub mod employee;
pub mod inventory_stock;
pub mod number_registry;
pub mod order;
pub mod order_item;
pub mod product;
pub mod route;
pub mod vehicle;
