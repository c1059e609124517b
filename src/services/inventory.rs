//! Stock-facing operations exposed over HTTP: goods receipt, batch
//! adjustments and the stock view of a product at a depot.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::db::{transaction, DbPool};
use crate::entities::{batch_detail, inventory_stock};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::allocation::fefo_cmp;
use crate::services::inventory_ledger::{self, Receipt};
use crate::services::master_data;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ReceiveStockRequest {
    pub product_id: i32,
    pub depot_id: i32,
    #[validate(length(min = 1, max = 64))]
    pub batch_number: String,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    pub expiry_date: Option<NaiveDate>,
    pub manufacturing_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AdjustBatchRequest {
    /// Signed unit correction
    pub delta: i32,
    #[validate(length(min = 1, max = 255))]
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StockQuery {
    pub product_id: i32,
    pub depot_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchResponse {
    pub id: i32,
    pub product_id: i32,
    pub depot_id: i32,
    pub batch_number: String,
    pub quantity: i32,
    pub available_quantity: i32,
    pub reserved_quantity: i32,
    pub expiry_date: Option<NaiveDate>,
    pub manufacturing_date: Option<NaiveDate>,
    pub status: String,
    /// False for legacy non-numeric batches
    pub allocatable: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<batch_detail::Model> for BatchResponse {
    fn from(batch: batch_detail::Model) -> Self {
        Self {
            allocatable: batch.has_numeric_batch_number(),
            id: batch.id,
            product_id: batch.product_id,
            depot_id: batch.depot_id,
            batch_number: batch.batch_number,
            quantity: batch.quantity,
            available_quantity: batch.available_quantity,
            reserved_quantity: batch.reserved_quantity,
            expiry_date: batch.expiry_date,
            manufacturing_date: batch.manufacturing_date,
            status: batch.status,
            updated_at: batch.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StockResponse {
    pub product_id: i32,
    pub depot_id: i32,
    pub stock_qty: i32,
    pub total_received: i32,
    pub total_issued: i32,
    pub total_adjusted: i32,
    /// Batches in FEFO order
    pub batches: Vec<BatchResponse>,
}

impl StockResponse {
    fn build(
        product_id: i32,
        depot_id: i32,
        aggregate: Option<inventory_stock::Model>,
        mut batches: Vec<batch_detail::Model>,
    ) -> Self {
        batches.sort_by(fefo_cmp);
        let (stock_qty, total_received, total_issued, total_adjusted) = aggregate
            .map(|a| (a.stock_qty, a.total_received, a.total_issued, a.total_adjusted))
            .unwrap_or_default();
        Self {
            product_id,
            depot_id,
            stock_qty,
            total_received,
            total_issued,
            total_adjusted,
            batches: batches.into_iter().map(BatchResponse::from).collect(),
        }
    }
}

#[derive(Clone)]
pub struct InventoryService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    timeout: Duration,
}

impl InventoryService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, timeout: Duration) -> Self {
        Self {
            db_pool,
            event_sender,
            timeout,
        }
    }

    #[instrument(skip(self, request), fields(product_id = request.product_id, depot_id = request.depot_id, batch = %request.batch_number))]
    pub async fn receive_stock(
        &self,
        request: ReceiveStockRequest,
    ) -> Result<BatchResponse, ServiceError> {
        request.validate()?;
        let receipt = Receipt {
            product_id: request.product_id,
            depot_id: request.depot_id,
            batch_number: request.batch_number.trim().to_string(),
            quantity: request.quantity,
            expiry_date: request.expiry_date,
            manufacturing_date: request.manufacturing_date,
        };

        let batch = transaction::bounded("inventory.receive", self.timeout, async {
            let txn = transaction::begin(&self.db_pool, self.timeout).await?;
            master_data::product(&txn, receipt.product_id).await?;
            master_data::depot(&txn, receipt.depot_id).await?;
            let batch = inventory_ledger::receive(&txn, &receipt).await?;
            txn.commit().await?;
            Ok(batch)
        })
        .await?;

        info!(batch_id = batch.id, quantity = receipt.quantity, "Stock received");
        self.event_sender
            .publish(Event::StockReceived {
                product_id: receipt.product_id,
                depot_id: receipt.depot_id,
                batch_number: receipt.batch_number,
                quantity: receipt.quantity,
            })
            .await;
        Ok(batch.into())
    }

    #[instrument(skip(self, request), fields(delta = request.delta))]
    pub async fn adjust_batch(
        &self,
        batch_id: i32,
        request: AdjustBatchRequest,
    ) -> Result<BatchResponse, ServiceError> {
        request.validate()?;

        let batch = transaction::bounded("inventory.adjust", self.timeout, async {
            let txn = transaction::begin(&self.db_pool, self.timeout).await?;
            let batch =
                inventory_ledger::adjust(&txn, batch_id, request.delta, &request.reason).await?;
            txn.commit().await?;
            Ok(batch)
        })
        .await?;

        self.event_sender
            .publish(Event::StockAdjusted {
                batch_id,
                delta: request.delta,
                reason: request.reason,
            })
            .await;
        Ok(batch.into())
    }

    #[instrument(skip(self))]
    pub async fn stock(&self, product_id: i32, depot_id: i32) -> Result<StockResponse, ServiceError> {
        let db = &*self.db_pool;
        let aggregate = inventory_ledger::find_aggregate(db, product_id, depot_id).await?;
        let batches = batch_detail::Entity::find()
            .filter(batch_detail::Column::ProductId.eq(product_id))
            .filter(batch_detail::Column::DepotId.eq(depot_id))
            .all(db)
            .await?;
        if aggregate.is_none() && batches.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "No stock for product {} at depot {}",
                product_id, depot_id
            )));
        }
        Ok(StockResponse::build(product_id, depot_id, aggregate, batches))
    }
}
