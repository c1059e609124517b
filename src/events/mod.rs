use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Domain events emitted after a business transaction commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // Order lifecycle
    OrderCreated(i32),
    OrderSubmitted(i32),
    OrderDeleted(i32),
    OrderValidated {
        order_id: i32,
        memo_number: Option<String>,
        full: bool,
    },
    OrdersPrinted {
        order_ids: Vec<i32>,
    },
    OrdersAssigned {
        loading_number: String,
        order_ids: Vec<i32>,
        employee_id: i32,
        vehicle_id: i32,
    },
    DeliveryApproved {
        loading_number: String,
        order_ids: Vec<i32>,
    },
    CollectionApproved {
        order_ids: Vec<i32>,
        approved_by: i32,
    },
    PendingCashCollected {
        order_id: i32,
        amount: Decimal,
        pending: Decimal,
    },

    // Deliveries and stock
    DeliveryCreated {
        delivery_id: i32,
        order_id: i32,
        picks: usize,
    },
    DeliveryCancelled {
        delivery_id: i32,
        order_id: i32,
    },
    StockReceived {
        product_id: i32,
        depot_id: i32,
        batch_number: String,
        quantity: i32,
    },
    StockAdjusted {
        batch_id: i32,
        delta: i32,
        reason: String,
    },

    // Cash reconciliation
    DepositCreated {
        deposit_id: i32,
        collector_id: i32,
        deposit_date: NaiveDate,
        total_collected: Decimal,
    },
    DepositApproved {
        deposit_id: i32,
        approved_by: i32,
    },
    RemainingCashReceived {
        deposit_id: i32,
        amount: Decimal,
        remaining: Decimal,
    },

    // Depot transfers
    TransferStatusChanged {
        transfer_id: i32,
        transfer_number: String,
        status: String,
    },
}

/// Cloneable handle for publishing [`Event`]s to the processing loop
#[derive(Clone, Debug)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
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

    /// Publishes an event whose transaction already committed; failures are only logged.
    pub async fn publish(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Dropping event after commit: {}", e);
        }
    }
}

/// Consumes events and writes them to the structured log.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match serde_json::to_string(&event) {
            Ok(payload) => info!(event = %payload, "Domain event"),
            Err(e) => warn!("Failed to serialize event {:?}: {}", event, e),
        }
    }

    info!("Event channel closed; processing loop stopped");
}
