//! Depot transfers.
//!
//! `Pending` holds a reservation at the source depot. Approval issues the
//! reserved units (`InTransit`), receipt books them into the destination
//! under the same batch number (`Received`), and rejection releases them.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, DbBackend, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::db::{transaction, DbPool};
use crate::entities::{depot_transfer, depot_transfer_item};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::status::TransferStatus;
use crate::services::inventory_ledger::{self, IssueFrom, Receipt};
use crate::services::{master_data, sequence::SequenceService};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct TransferItemRequest {
    /// Batch at the source depot
    pub batch_id: i32,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateTransferRequest {
    pub source_depot_id: i32,
    pub destination_depot_id: i32,
    #[validate(length(min = 1, message = "A transfer needs at least one item"))]
    pub items: Vec<TransferItemRequest>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransferItemResponse {
    pub id: i32,
    pub product_id: i32,
    pub batch_detail_id: i32,
    pub batch_number: String,
    pub expiry_date: Option<NaiveDate>,
    pub manufacturing_date: Option<NaiveDate>,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransferResponse {
    pub id: i32,
    pub transfer_number: String,
    pub source_depot_id: i32,
    pub destination_depot_id: i32,
    pub status: TransferStatus,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub items: Vec<TransferItemResponse>,
}

impl TransferResponse {
    fn build(
        model: depot_transfer::Model,
        items: Vec<depot_transfer_item::Model>,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            status: transfer_status(&model)?,
            id: model.id,
            transfer_number: model.transfer_number,
            source_depot_id: model.source_depot_id,
            destination_depot_id: model.destination_depot_id,
            remarks: model.remarks,
            created_at: model.created_at,
            approved_at: model.approved_at,
            received_at: model.received_at,
            rejected_at: model.rejected_at,
            items: items
                .into_iter()
                .map(|i| TransferItemResponse {
                    id: i.id,
                    product_id: i.product_id,
                    batch_detail_id: i.batch_detail_id,
                    batch_number: i.batch_number,
                    expiry_date: i.expiry_date,
                    manufacturing_date: i.manufacturing_date,
                    quantity: i.quantity,
                })
                .collect(),
        })
    }
}

fn transfer_status(model: &depot_transfer::Model) -> Result<TransferStatus, ServiceError> {
    TransferStatus::from_str(&model.status).map_err(|_| {
        ServiceError::InternalError(format!(
            "transfer {} has unknown status '{}'",
            model.transfer_number, model.status
        ))
    })
}

async fn transfer_items<C: ConnectionTrait>(
    conn: &C,
    transfer_id: i32,
) -> Result<Vec<depot_transfer_item::Model>, ServiceError> {
    Ok(depot_transfer_item::Entity::find()
        .filter(depot_transfer_item::Column::TransferId.eq(transfer_id))
        .order_by_asc(depot_transfer_item::Column::Id)
        .all(conn)
        .await?)
}

/// Loads a transfer under lock and checks it is in `expected`.
async fn lock_transfer(
    txn: &DatabaseTransaction,
    transfer_id: i32,
    expected: TransferStatus,
) -> Result<depot_transfer::Model, ServiceError> {
    let mut query = depot_transfer::Entity::find_by_id(transfer_id);
    if txn.get_database_backend() != DbBackend::Sqlite {
        query = query.lock_exclusive();
    }
    let transfer = query
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Transfer {} not found", transfer_id)))?;
    let status = transfer_status(&transfer)?;
    if status != expected {
        return Err(ServiceError::invalid_state(
            format!("transfer {}", transfer.transfer_number),
            status.to_string(),
            expected.to_string(),
        ));
    }
    Ok(transfer)
}

#[derive(Clone)]
pub struct TransferService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    sequence: SequenceService,
    timeout: Duration,
}

impl TransferService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        sequence: SequenceService,
        timeout: Duration,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            sequence,
            timeout,
        }
    }

    async fn announce(&self, transfer: &TransferResponse) {
        info!(
            transfer_id = transfer.id,
            transfer_number = %transfer.transfer_number,
            status = %transfer.status,
            "Transfer status changed"
        );
        self.event_sender
            .publish(Event::TransferStatusChanged {
                transfer_id: transfer.id,
                transfer_number: transfer.transfer_number.clone(),
                status: transfer.status.to_string(),
            })
            .await;
    }

    /// Reserves the requested batches at the source depot.
    #[instrument(skip(self, request), fields(source = request.source_depot_id, destination = request.destination_depot_id))]
    pub async fn create_transfer(
        &self,
        request: CreateTransferRequest,
    ) -> Result<TransferResponse, ServiceError> {
        request.validate()?;
        for item in &request.items {
            item.validate()?;
        }
        if request.source_depot_id == request.destination_depot_id {
            return Err(ServiceError::ValidationError(
                "source and destination depot must differ".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = request.items.iter().find(|i| !seen.insert(i.batch_id)) {
            return Err(ServiceError::ValidationError(format!(
                "batch {} is listed more than once",
                dup.batch_id
            )));
        }

        let response = transaction::bounded("transfers.create", self.timeout, async {
            let txn = transaction::begin(&self.db_pool, self.timeout).await?;
            master_data::depot(&txn, request.source_depot_id).await?;
            master_data::depot(&txn, request.destination_depot_id).await?;

            let mut batches = Vec::with_capacity(request.items.len());
            for item in &request.items {
                let batch = inventory_ledger::find_batch(&txn, item.batch_id).await?;
                if batch.depot_id != request.source_depot_id {
                    return Err(ServiceError::ValidationError(format!(
                        "batch {} is not held at depot {}",
                        batch.batch_number, request.source_depot_id
                    )));
                }
                if !batch.has_numeric_batch_number() {
                    return Err(ServiceError::ValidationError(format!(
                        "batch '{}' has a non-numeric number and cannot be transferred",
                        batch.batch_number
                    )));
                }
                inventory_ledger::reserve(&txn, batch.id, item.quantity).await?;
                batches.push((batch, item.quantity));
            }

            let now = Utc::now();
            let transfer_number = self
                .sequence
                .next_transfer_number(&txn, now.date_naive())
                .await?;
            let transfer = depot_transfer::ActiveModel {
                transfer_number: Set(transfer_number),
                source_depot_id: Set(request.source_depot_id),
                destination_depot_id: Set(request.destination_depot_id),
                status: Set(TransferStatus::Pending.to_string()),
                remarks: Set(request.remarks.clone()),
                created_at: Set(now),
                approved_at: Set(None),
                received_at: Set(None),
                rejected_at: Set(None),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to create transfer");
                ServiceError::DatabaseError(e)
            })?;

            let mut items = Vec::with_capacity(batches.len());
            for (batch, quantity) in batches {
                let item = depot_transfer_item::ActiveModel {
                    transfer_id: Set(transfer.id),
                    product_id: Set(batch.product_id),
                    batch_detail_id: Set(batch.id),
                    batch_number: Set(batch.batch_number),
                    expiry_date: Set(batch.expiry_date),
                    manufacturing_date: Set(batch.manufacturing_date),
                    quantity: Set(quantity),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
                items.push(item);
            }

            txn.commit().await?;
            TransferResponse::build(transfer, items)
        })
        .await?;

        self.announce(&response).await;
        Ok(response)
    }

    #[instrument(skip(self))]
    pub async fn get_transfer(&self, transfer_id: i32) -> Result<TransferResponse, ServiceError> {
        let db = &*self.db_pool;
        let transfer = depot_transfer::Entity::find_by_id(transfer_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Transfer {} not found", transfer_id)))?;
        let items = transfer_items(db, transfer_id).await?;
        TransferResponse::build(transfer, items)
    }

    /// Pending → InTransit: the reserved units leave the source depot.
    #[instrument(skip(self))]
    pub async fn approve_transfer(&self, transfer_id: i32) -> Result<TransferResponse, ServiceError> {
        let response = transaction::bounded("transfers.approve", self.timeout, async {
            let txn = transaction::begin(&self.db_pool, self.timeout).await?;
            let transfer = lock_transfer(&txn, transfer_id, TransferStatus::Pending).await?;
            let items = transfer_items(&txn, transfer_id).await?;
            for item in &items {
                inventory_ledger::issue(&txn, item.batch_detail_id, item.quantity, IssueFrom::Reserved)
                    .await?;
            }

            let mut active: depot_transfer::ActiveModel = transfer.into();
            active.status = Set(TransferStatus::InTransit.to_string());
            active.approved_at = Set(Some(Utc::now()));
            let transfer = active.update(&txn).await?;
            txn.commit().await?;
            TransferResponse::build(transfer, items)
        })
        .await?;

        self.announce(&response).await;
        Ok(response)
    }

    /// InTransit → Received: units are booked at the destination under the same batch.
    #[instrument(skip(self))]
    pub async fn receive_transfer(&self, transfer_id: i32) -> Result<TransferResponse, ServiceError> {
        let response = transaction::bounded("transfers.receive", self.timeout, async {
            let txn = transaction::begin(&self.db_pool, self.timeout).await?;
            let transfer = lock_transfer(&txn, transfer_id, TransferStatus::InTransit).await?;
            let items = transfer_items(&txn, transfer_id).await?;
            for item in &items {
                inventory_ledger::receive(
                    &txn,
                    &Receipt {
                        product_id: item.product_id,
                        depot_id: transfer.destination_depot_id,
                        batch_number: item.batch_number.clone(),
                        quantity: item.quantity,
                        expiry_date: item.expiry_date,
                        manufacturing_date: item.manufacturing_date,
                    },
                )
                .await?;
            }

            let mut active: depot_transfer::ActiveModel = transfer.into();
            active.status = Set(TransferStatus::Received.to_string());
            active.received_at = Set(Some(Utc::now()));
            let transfer = active.update(&txn).await?;
            txn.commit().await?;
            TransferResponse::build(transfer, items)
        })
        .await?;

        self.announce(&response).await;
        Ok(response)
    }

    /// Pending → Rejected: the source reservation is released.
    #[instrument(skip(self))]
    pub async fn reject_transfer(&self, transfer_id: i32) -> Result<TransferResponse, ServiceError> {
        let response = transaction::bounded("transfers.reject", self.timeout, async {
            let txn = transaction::begin(&self.db_pool, self.timeout).await?;
            let transfer = lock_transfer(&txn, transfer_id, TransferStatus::Pending).await?;
            let items = transfer_items(&txn, transfer_id).await?;
            for item in &items {
                inventory_ledger::release(&txn, item.batch_detail_id, item.quantity).await?;
            }

            let mut active: depot_transfer::ActiveModel = transfer.into();
            active.status = Set(TransferStatus::Rejected.to_string());
            active.rejected_at = Set(Some(Utc::now()));
            let transfer = active.update(&txn).await?;
            txn.commit().await?;
            TransferResponse::build(transfer, items)
        })
        .await?;

        self.announce(&response).await;
        Ok(response)
    }
}
