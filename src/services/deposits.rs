//! Cash deposits: a collector hands over one day's collections, the office
//! approves the deposit, and any shortfall is received later as receipts.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseTransaction, DbBackend, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, ConnectionTrait,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument};
use utoipa::ToSchema;

use crate::db::{transaction, DbPool};
use crate::entities::{collection_deposit, collection_transaction, deposit_receipt};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::status::DepositChannel;
use crate::services::master_data;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateDepositRequest {
    pub collector_id: i32,
    pub deposit_date: NaiveDate,
    pub deposited_amount: Decimal,
    pub channel: DepositChannel,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApproveDepositRequest {
    pub approved_by: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReceiveRemainingRequest {
    pub amount: Decimal,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DepositReceiptResponse {
    pub id: i32,
    pub amount: Decimal,
    pub remaining_after: Decimal,
    pub note: Option<String>,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DepositResponse {
    pub id: i32,
    pub collector_id: i32,
    pub deposit_date: NaiveDate,
    pub total_collected: Decimal,
    pub deposited_amount: Decimal,
    pub remaining_amount: Decimal,
    pub channel: DepositChannel,
    pub approved: bool,
    pub approved_by: Option<i32>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Collection transactions reconciled by this deposit
    pub transaction_ids: Vec<i32>,
    pub receipts: Vec<DepositReceiptResponse>,
}

impl DepositResponse {
    fn build(
        model: collection_deposit::Model,
        transaction_ids: Vec<i32>,
        receipts: Vec<deposit_receipt::Model>,
    ) -> Result<Self, ServiceError> {
        let channel = DepositChannel::from_str(&model.channel).map_err(|_| {
            ServiceError::InternalError(format!(
                "deposit {} has unknown channel '{}'",
                model.id, model.channel
            ))
        })?;
        Ok(Self {
            id: model.id,
            collector_id: model.collector_id,
            deposit_date: model.deposit_date,
            total_collected: model.total_collected,
            deposited_amount: model.deposited_amount,
            remaining_amount: model.remaining_amount,
            channel,
            approved: model.approved,
            approved_by: model.approved_by,
            approved_at: model.approved_at,
            created_at: model.created_at,
            transaction_ids,
            receipts: receipts
                .into_iter()
                .map(|r| DepositReceiptResponse {
                    id: r.id,
                    amount: r.amount,
                    remaining_after: r.remaining_after,
                    note: r.note,
                    received_at: r.received_at,
                })
                .collect(),
        })
    }
}

async fn lock_deposit(
    txn: &DatabaseTransaction,
    deposit_id: i32,
) -> Result<collection_deposit::Model, ServiceError> {
    let mut query = collection_deposit::Entity::find_by_id(deposit_id);
    if txn.get_database_backend() != DbBackend::Sqlite {
        query = query.lock_exclusive();
    }
    query
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Deposit {} not found", deposit_id)))
}

async fn load_details<C: ConnectionTrait>(
    conn: &C,
    deposit: collection_deposit::Model,
) -> Result<DepositResponse, ServiceError> {
    let transaction_ids = collection_transaction::Entity::find()
        .filter(collection_transaction::Column::DepositId.eq(deposit.id))
        .order_by_asc(collection_transaction::Column::Id)
        .all(conn)
        .await?
        .into_iter()
        .map(|t| t.id)
        .collect();
    let receipts = deposit_receipt::Entity::find()
        .filter(deposit_receipt::Column::DepositId.eq(deposit.id))
        .order_by_asc(deposit_receipt::Column::Id)
        .all(conn)
        .await?;
    DepositResponse::build(deposit, transaction_ids, receipts)
}

#[derive(Clone)]
pub struct DepositService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    timeout: Duration,
}

impl DepositService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, timeout: Duration) -> Self {
        Self {
            db_pool,
            event_sender,
            timeout,
        }
    }

    /// Reconciles a collector's open collection transactions of one day.
    #[instrument(skip(self, request), fields(collector_id = request.collector_id, date = %request.deposit_date))]
    pub async fn create_deposit(
        &self,
        request: CreateDepositRequest,
    ) -> Result<DepositResponse, ServiceError> {
        if request.deposited_amount < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "deposited amount must not be negative".to_string(),
            ));
        }

        let response = transaction::bounded("deposits.create", self.timeout, async {
            let txn = transaction::begin(&self.db_pool, self.timeout).await?;
            master_data::employee(&txn, request.collector_id).await?;

            let mut open = collection_transaction::Entity::find()
                .filter(collection_transaction::Column::CollectorId.eq(request.collector_id))
                .filter(collection_transaction::Column::CollectionDate.eq(request.deposit_date))
                .filter(collection_transaction::Column::DepositId.is_null());
            if txn.get_database_backend() != DbBackend::Sqlite {
                open = open.lock_exclusive();
            }
            let open = open.all(&txn).await?;
            if open.is_empty() {
                return Err(ServiceError::ValidationError(format!(
                    "collector {} has no unreconciled collections on {}",
                    request.collector_id, request.deposit_date
                )));
            }

            let total: Decimal = open.iter().map(|t| t.collected_amount).sum();
            if request.deposited_amount > total {
                return Err(ServiceError::ValidationError(format!(
                    "deposited {} exceeds the {} collected",
                    request.deposited_amount, total
                )));
            }

            let deposit = collection_deposit::ActiveModel {
                collector_id: Set(request.collector_id),
                deposit_date: Set(request.deposit_date),
                total_collected: Set(total),
                deposited_amount: Set(request.deposited_amount),
                remaining_amount: Set(total - request.deposited_amount),
                channel: Set(request.channel.to_string()),
                approved: Set(false),
                approved_by: Set(None),
                approved_at: Set(None),
                created_at: Set(Utc::now()),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to create deposit");
                ServiceError::DatabaseError(e)
            })?;

            let ids: Vec<i32> = open.iter().map(|t| t.id).collect();
            let linked = collection_transaction::Entity::update_many()
                .col_expr(
                    collection_transaction::Column::DepositId,
                    Expr::value(Some(deposit.id)),
                )
                .filter(collection_transaction::Column::Id.is_in(ids.clone()))
                .filter(collection_transaction::Column::DepositId.is_null())
                .exec(&txn)
                .await?;
            if linked.rows_affected != ids.len() as u64 {
                return Err(ServiceError::Conflict(format!(
                    "collections of collector {} were reconciled concurrently",
                    request.collector_id
                )));
            }

            txn.commit().await?;
            DepositResponse::build(deposit, ids, Vec::new())
        })
        .await?;

        info!(deposit_id = response.id, total = %response.total_collected, "Deposit created");
        self.event_sender
            .publish(Event::DepositCreated {
                deposit_id: response.id,
                collector_id: response.collector_id,
                deposit_date: response.deposit_date,
                total_collected: response.total_collected,
            })
            .await;
        Ok(response)
    }

    #[instrument(skip(self))]
    pub async fn approve_deposit(
        &self,
        deposit_id: i32,
        approved_by: i32,
    ) -> Result<DepositResponse, ServiceError> {
        let response = transaction::bounded("deposits.approve", self.timeout, async {
            let txn = transaction::begin(&self.db_pool, self.timeout).await?;
            master_data::employee(&txn, approved_by).await?;
            let deposit = lock_deposit(&txn, deposit_id).await?;
            if deposit.approved {
                return Err(ServiceError::invalid_state(
                    format!("deposit {}", deposit_id),
                    "approved",
                    "unapproved",
                ));
            }

            let mut active: collection_deposit::ActiveModel = deposit.into();
            active.approved = Set(true);
            active.approved_by = Set(Some(approved_by));
            active.approved_at = Set(Some(Utc::now()));
            let deposit = active.update(&txn).await?;
            let response = load_details(&txn, deposit).await?;
            txn.commit().await?;
            Ok(response)
        })
        .await?;

        self.event_sender
            .publish(Event::DepositApproved {
                deposit_id,
                approved_by,
            })
            .await;
        Ok(response)
    }

    /// Records cash handed in later against a deposit's remaining amount.
    #[instrument(skip(self, request), fields(amount = %request.amount))]
    pub async fn receive_remaining(
        &self,
        deposit_id: i32,
        request: ReceiveRemainingRequest,
    ) -> Result<DepositResponse, ServiceError> {
        let response = transaction::bounded("deposits.receive_remaining", self.timeout, async {
            let txn = transaction::begin(&self.db_pool, self.timeout).await?;
            let deposit = lock_deposit(&txn, deposit_id).await?;
            if request.amount <= Decimal::ZERO || request.amount > deposit.remaining_amount {
                return Err(ServiceError::ValidationError(format!(
                    "amount {} must be positive and at most the remaining {} of deposit {}",
                    request.amount, deposit.remaining_amount, deposit_id
                )));
            }

            let remaining = deposit.remaining_amount - request.amount;
            deposit_receipt::ActiveModel {
                deposit_id: Set(deposit_id),
                amount: Set(request.amount),
                remaining_after: Set(remaining),
                note: Set(request
                    .note
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(str::to_string)),
                received_at: Set(Utc::now()),
                ..Default::default()
            }
            .insert(&txn)
            .await?;

            let mut active: collection_deposit::ActiveModel = deposit.into();
            active.remaining_amount = Set(remaining);
            let deposit = active.update(&txn).await?;
            let response = load_details(&txn, deposit).await?;
            txn.commit().await?;
            Ok(response)
        })
        .await?;

        self.event_sender
            .publish(Event::RemainingCashReceived {
                deposit_id,
                amount: request.amount,
                remaining: response.remaining_amount,
            })
            .await;
        Ok(response)
    }

    #[instrument(skip(self))]
    pub async fn get_deposit(&self, deposit_id: i32) -> Result<DepositResponse, ServiceError> {
        let db = &*self.db_pool;
        let deposit = collection_deposit::Entity::find_by_id(deposit_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Deposit {} not found", deposit_id)))?;
        load_details(db, deposit).await
    }
}
