//! Collection queues, collection approval and cash collected against
//! pending balances after approval.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::db::{transaction, DbPool};
use crate::entities::{collection_transaction, order};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::metrics;
use crate::models::order_state::OrderState;
use crate::models::status::{CollectionSource, CollectionStatus, Stage};
use crate::services::master_data;
use crate::services::order_lifecycle::{describe, distinct_ids, lock_order, persist_state};

/// One order's cash position as shown in the collection queues.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CollectionEntry {
    pub order_id: i32,
    pub memo_number: Option<String>,
    pub loading_number: Option<String>,
    pub customer_name: String,
    pub customer_code: String,
    pub total_amount: Decimal,
    pub collection_status: CollectionStatus,
    pub collection_source: CollectionSource,
    pub collected_amount: Decimal,
    pub pending_amount: Decimal,
    pub postponed: bool,
    pub collection_approved: bool,
    pub approved_at: Option<DateTime<Utc>>,
}

impl CollectionEntry {
    fn build(model: &order::Model) -> Result<Self, ServiceError> {
        let state = OrderState::try_from(model)?;
        let collection = state.collection().ok_or_else(|| {
            ServiceError::invalid_state(
                describe(model.id),
                state.stage().to_string(),
                "Delivered or CollectionApproved",
            )
        })?;
        Ok(Self {
            order_id: model.id,
            memo_number: state.memo().map(|m| m.to_string()),
            loading_number: state.assignment().map(|a| a.loading_number.clone()),
            customer_name: model.customer_name.clone(),
            customer_code: model.customer_code.clone(),
            total_amount: model.total_amount,
            collection_status: collection.status,
            collection_source: collection.source,
            collected_amount: collection.collected,
            pending_amount: collection.pending,
            postponed: model.postponed,
            collection_approved: state.is_collection_approved(),
            approved_at: model.collection_approved_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CollectionApprovalRequest {
    pub order_ids: Vec<i32>,
    pub approved_by: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CollectPendingRequest {
    pub amount: Decimal,
}

#[derive(Clone)]
pub struct CollectionService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    timeout: Duration,
}

impl CollectionService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, timeout: Duration) -> Self {
        Self {
            db_pool,
            event_sender,
            timeout,
        }
    }

    async fn delivered_orders(
        &self,
        source: CollectionSource,
        statuses: &[CollectionStatus],
    ) -> Result<Vec<CollectionEntry>, ServiceError> {
        let mut query = order::Entity::find()
            .filter(order::Column::Stage.eq(Stage::Delivered.to_string()))
            .filter(order::Column::CollectionSource.eq(source.to_string()));
        if !statuses.is_empty() {
            query = query.filter(
                order::Column::CollectionStatus.is_in(statuses.iter().map(|s| s.to_string())),
            );
        }
        query
            .order_by_asc(order::Column::LoadingNumber)
            .order_by_asc(order::Column::Id)
            .all(&*self.db_pool)
            .await?
            .iter()
            .map(CollectionEntry::build)
            .collect()
    }

    /// Office queue: web-reported deliveries awaiting collection approval.
    #[instrument(skip(self))]
    pub async fn remaining_cash_queue(&self) -> Result<Vec<CollectionEntry>, ServiceError> {
        self.delivered_orders(CollectionSource::Web, &[]).await
    }

    /// Mobile queue: app-reported deliveries with cash still outstanding.
    #[instrument(skip(self))]
    pub async fn mobile_queue(&self) -> Result<Vec<CollectionEntry>, ServiceError> {
        self.delivered_orders(
            CollectionSource::MobileApp,
            &[CollectionStatus::PartiallyCollected, CollectionStatus::Postponed],
        )
        .await
    }

    #[instrument(skip(self, request), fields(orders = request.order_ids.len(), approved_by = request.approved_by))]
    pub async fn approve_collections(
        &self,
        request: CollectionApprovalRequest,
    ) -> Result<Vec<CollectionEntry>, ServiceError> {
        let order_ids = distinct_ids(&request.order_ids, "order")?;
        let approved_by = request.approved_by;

        let entries = transaction::bounded("collections.approve", self.timeout, async {
            let txn = transaction::begin(&self.db_pool, self.timeout).await?;
            master_data::employee(&txn, approved_by).await?;
            let now = Utc::now();

            let mut entries = Vec::with_capacity(order_ids.len());
            for order_id in &order_ids {
                let (model, state) = lock_order(&txn, *order_id).await?;
                let next = state.approve_collection(&describe(*order_id), now, approved_by)?;
                let saved = persist_state(&txn, model, &next, |_| {}).await?;
                entries.push(CollectionEntry::build(&saved)?);
            }
            txn.commit().await?;
            Ok(entries)
        })
        .await?;

        metrics::record_transition("approve_collection", entries.len() as u64);
        self.event_sender
            .publish(Event::CollectionApproved {
                order_ids: entries.iter().map(|e| e.order_id).collect(),
                approved_by,
            })
            .await;
        Ok(entries)
    }

    /// Books cash received later against an approved order's pending balance.
    #[instrument(skip(self))]
    pub async fn collect_pending(
        &self,
        order_id: i32,
        amount: Decimal,
    ) -> Result<CollectionEntry, ServiceError> {
        let entry = transaction::bounded("collections.collect_pending", self.timeout, async {
            let txn = transaction::begin(&self.db_pool, self.timeout).await?;
            let (model, state) = lock_order(&txn, order_id).await?;
            let next = state.collect_pending(&describe(order_id), amount)?;

            let (memo, collector_id, collection) = match &next {
                OrderState::CollectionApproved {
                    memo,
                    assignment,
                    collection,
                    ..
                } => (memo.to_string(), assignment.employee_id, collection.clone()),
                other => {
                    return Err(ServiceError::InternalError(format!(
                        "collecting cash left {} in {}",
                        describe(order_id),
                        other.stage()
                    )))
                }
            };

            let saved = persist_state(&txn, model, &next, |_| {}).await?;
            collection_transaction::ActiveModel {
                order_id: Set(order_id),
                memo_number: Set(memo),
                collector_id: Set(collector_id),
                collection_date: Set(Utc::now().date_naive()),
                source: Set(collection.source.to_string()),
                collected_amount: Set(amount),
                pending_amount: Set(collection.pending),
                deposit_id: Set(None),
                created_at: Set(Utc::now()),
                ..Default::default()
            }
            .insert(&txn)
            .await?;

            txn.commit().await?;
            CollectionEntry::build(&saved)
        })
        .await?;

        info!(order_id, %amount, pending = %entry.pending_amount, "Pending cash collected");
        self.event_sender
            .publish(Event::PendingCashCollected {
                order_id,
                amount,
                pending: entry.pending_amount,
            })
            .await;
        Ok(entry)
    }
}
