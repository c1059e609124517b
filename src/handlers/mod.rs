pub mod collections;
pub mod common;
pub mod deliveries;
pub mod deposits;
pub mod health;
pub mod inventory;
pub mod orders;
pub mod transfers;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    collections::CollectionService, deliveries::DeliveryService, deposits::DepositService,
    inventory::InventoryService, order_lifecycle::OrderLifecycleService,
    sequence::SequenceService, transfers::TransferService,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderLifecycleService>,
    pub deliveries: Arc<DeliveryService>,
    pub collections: Arc<CollectionService>,
    pub deposits: Arc<DepositService>,
    pub inventory: Arc<InventoryService>,
    pub transfers: Arc<TransferService>,
}

impl AppServices {
    /// Builds every service on one pool, one event channel and the configured
    /// transaction deadline.
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, config: &AppConfig) -> Self {
        let timeout = config.transaction_timeout();
        let sequence = SequenceService::from_config(config);

        Self {
            orders: Arc::new(OrderLifecycleService::new(
                db_pool.clone(),
                event_sender.clone(),
                sequence.clone(),
                timeout,
            )),
            deliveries: Arc::new(DeliveryService::new(
                db_pool.clone(),
                event_sender.clone(),
                timeout,
            )),
            collections: Arc::new(CollectionService::new(
                db_pool.clone(),
                event_sender.clone(),
                timeout,
            )),
            deposits: Arc::new(DepositService::new(
                db_pool.clone(),
                event_sender.clone(),
                timeout,
            )),
            inventory: Arc::new(InventoryService::new(
                db_pool.clone(),
                event_sender.clone(),
                timeout,
            )),
            transfers: Arc::new(TransferService::new(
                db_pool,
                event_sender,
                sequence,
                timeout,
            )),
        }
    }
}
