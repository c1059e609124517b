//! Deliveries: FEFO picking for a validated order, cancellation, and the
//! delivery approval that records each order's cash outcome and settles its
//! reserved stock.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, DbBackend, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, ConnectionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::db::{transaction, DbPool};
use crate::entities::{collection_transaction, delivery, delivery_item, order};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::metrics;
use crate::models::order_state::{Collection, OrderState};
use crate::models::pricing::LineAmounts;
use crate::models::status::{CollectionSource, CollectionStatus, DeliveryStatus, Stage};
use crate::services::inventory_ledger::{self, IssueFrom};
use crate::services::order_lifecycle::{describe, lock_order, order_items, persist_state};
use crate::services::{allocation, master_data};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateDeliveryRequest {
    pub order_id: i32,
    pub vehicle_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeliveryItemResponse {
    pub id: i32,
    pub order_item_id: i32,
    pub product_id: i32,
    pub batch_detail_id: i32,
    pub batch_number: String,
    pub expiry_date: Option<NaiveDate>,
    pub pick_sequence: i32,
    pub ordered_quantity: i32,
    pub picked_quantity: i32,
    pub delivered_quantity: i32,
    pub returned_quantity: i32,
    pub free_goods_quantity: i32,
    pub trade_amount: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
}

impl From<delivery_item::Model> for DeliveryItemResponse {
    fn from(item: delivery_item::Model) -> Self {
        Self {
            id: item.id,
            order_item_id: item.order_item_id,
            product_id: item.product_id,
            batch_detail_id: item.batch_detail_id,
            batch_number: item.batch_number,
            expiry_date: item.expiry_date,
            pick_sequence: item.pick_sequence,
            ordered_quantity: item.ordered_quantity,
            picked_quantity: item.picked_quantity,
            delivered_quantity: item.delivered_quantity,
            returned_quantity: item.returned_quantity,
            free_goods_quantity: item.free_goods_quantity,
            trade_amount: item.trade_amount,
            discount_amount: item.discount_amount,
            tax_amount: item.tax_amount,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeliveryResponse {
    pub id: i32,
    pub order_id: i32,
    pub depot_id: i32,
    pub vehicle_id: Option<i32>,
    pub status: DeliveryStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub items: Vec<DeliveryItemResponse>,
}

impl DeliveryResponse {
    fn build(model: delivery::Model, items: Vec<delivery_item::Model>) -> Result<Self, ServiceError> {
        Ok(Self {
            status: delivery_status(&model)?,
            id: model.id,
            order_id: model.order_id,
            depot_id: model.depot_id,
            vehicle_id: model.vehicle_id,
            created_at: model.created_at,
            completed_at: model.completed_at,
            cancelled_at: model.cancelled_at,
            items: items.into_iter().map(DeliveryItemResponse::from).collect(),
        })
    }
}

/// Units delivered and returned for one memo of the loading.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct MemoOutcome {
    #[validate(length(min = 1))]
    pub memo_number: String,
    #[validate(range(min = 0))]
    pub delivered: i32,
    #[validate(range(min = 0))]
    pub returned: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct DeliveryApprovalRequest {
    #[validate(length(min = 1))]
    pub loading_number: String,
    pub source: CollectionSource,
    #[validate(length(min = 1, message = "At least one memo outcome is required"))]
    pub memos: Vec<MemoOutcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApprovedDelivery {
    pub order_id: i32,
    pub memo_number: String,
    pub collection_status: CollectionStatus,
    pub collected_amount: Decimal,
    pub pending_amount: Decimal,
    /// True when a picked delivery's reservations were issued or released
    pub stock_settled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeliveryApprovalOutcome {
    pub loading_number: String,
    pub orders: Vec<ApprovedDelivery>,
}

fn delivery_status(model: &delivery::Model) -> Result<DeliveryStatus, ServiceError> {
    DeliveryStatus::from_str(&model.status).map_err(|_| {
        ServiceError::InternalError(format!(
            "delivery {} has unknown status '{}'",
            model.id, model.status
        ))
    })
}

async fn lock_delivery(
    txn: &DatabaseTransaction,
    delivery_id: i32,
) -> Result<delivery::Model, ServiceError> {
    let mut query = delivery::Entity::find_by_id(delivery_id);
    if txn.get_database_backend() != DbBackend::Sqlite {
        query = query.lock_exclusive();
    }
    query
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Delivery {} not found", delivery_id)))
}

async fn delivery_items<C: ConnectionTrait>(
    conn: &C,
    delivery_id: i32,
) -> Result<Vec<delivery_item::Model>, ServiceError> {
    Ok(delivery_item::Entity::find()
        .filter(delivery_item::Column::DeliveryId.eq(delivery_id))
        .order_by_asc(delivery_item::Column::PickSequence)
        .all(conn)
        .await?)
}

/// Splits `delivered` units over picks in allocation order; the rest are returns.
fn split_outcome(picked: &[i32], delivered: i32) -> Vec<(i32, i32)> {
    let mut remaining = delivered;
    picked
        .iter()
        .map(|qty| {
            let delivered = remaining.min(*qty).max(0);
            remaining -= delivered;
            (delivered, qty - delivered)
        })
        .collect()
}

/// Issues delivered units and releases returned ones for the order's picked delivery.
///
/// Returns false when the order has no picked delivery.
pub(crate) async fn settle_delivery(
    txn: &DatabaseTransaction,
    order_id: i32,
    delivered: i32,
    returned: i32,
) -> Result<bool, ServiceError> {
    let picked = delivery::Entity::find()
        .filter(delivery::Column::OrderId.eq(order_id))
        .filter(delivery::Column::Status.eq(DeliveryStatus::Picked.to_string()))
        .one(txn)
        .await?;
    let Some(picked) = picked else {
        return Ok(false);
    };

    let items = delivery_items(txn, picked.id).await?;
    let total_picked: i64 = items.iter().map(|i| i64::from(i.picked_quantity)).sum();
    if i64::from(delivered) + i64::from(returned) != total_picked {
        return Err(ServiceError::ValidationError(format!(
            "{}: delivered {} + returned {} must equal the {} units picked",
            describe(order_id),
            delivered,
            returned,
            total_picked
        )));
    }

    let quantities: Vec<i32> = items.iter().map(|i| i.picked_quantity).collect();
    for (item, (issued, released)) in items.into_iter().zip(split_outcome(&quantities, delivered)) {
        if issued > 0 {
            inventory_ledger::issue(txn, item.batch_detail_id, issued, IssueFrom::Reserved).await?;
        }
        if released > 0 {
            inventory_ledger::release(txn, item.batch_detail_id, released).await?;
        }
        let mut active: delivery_item::ActiveModel = item.into();
        active.delivered_quantity = Set(issued);
        active.returned_quantity = Set(released);
        active.update(txn).await?;
    }

    let mut active: delivery::ActiveModel = picked.into();
    active.status = Set(DeliveryStatus::Completed.to_string());
    active.completed_at = Set(Some(Utc::now()));
    active.update(txn).await?;
    Ok(true)
}

#[derive(Clone)]
pub struct DeliveryService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    timeout: Duration,
}

impl DeliveryService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, timeout: Duration) -> Self {
        Self {
            db_pool,
            event_sender,
            timeout,
        }
    }

    /// Allocates every selected item of a validated order and reserves the picks.
    #[instrument(skip(self, request), fields(order_id = request.order_id))]
    pub async fn create_delivery(
        &self,
        request: CreateDeliveryRequest,
    ) -> Result<DeliveryResponse, ServiceError> {
        let order_id = request.order_id;
        let (model, items) = transaction::bounded("deliveries.create", self.timeout, async {
            let txn = transaction::begin(&self.db_pool, self.timeout).await?;
            let (order, state) = lock_order(&txn, order_id).await?;
            if !matches!(
                state.stage(),
                Stage::Validated | Stage::Printed | Stage::Assigned
            ) {
                return Err(ServiceError::invalid_state(
                    describe(order_id),
                    state.stage().to_string(),
                    "Validated, Printed or Assigned",
                ));
            }
            if let Some(vehicle_id) = request.vehicle_id {
                master_data::vehicle(&txn, vehicle_id).await?;
            }

            let now = Utc::now();
            let existing = delivery::Entity::find()
                .filter(delivery::Column::OrderId.eq(order_id))
                .one(&txn)
                .await?;
            let header = match existing {
                Some(previous) if delivery_status(&previous)? != DeliveryStatus::Cancelled => {
                    return Err(ServiceError::invalid_state(
                        format!("delivery {} of {}", previous.id, describe(order_id)),
                        previous.status,
                        "Cancelled",
                    ));
                }
                // A cancelled delivery is picked again under the same id
                Some(previous) => {
                    delivery_item::Entity::delete_many()
                        .filter(delivery_item::Column::DeliveryId.eq(previous.id))
                        .exec(&txn)
                        .await?;
                    let mut active: delivery::ActiveModel = previous.into();
                    active.depot_id = Set(order.depot_id);
                    active.vehicle_id = Set(request.vehicle_id);
                    active.status = Set(DeliveryStatus::Picked.to_string());
                    active.created_at = Set(now);
                    active.completed_at = Set(None);
                    active.cancelled_at = Set(None);
                    active.update(&txn).await?
                }
                None => delivery::ActiveModel {
                    order_id: Set(order_id),
                    depot_id: Set(order.depot_id),
                    vehicle_id: Set(request.vehicle_id),
                    status: Set(DeliveryStatus::Picked.to_string()),
                    created_at: Set(now),
                    completed_at: Set(None),
                    cancelled_at: Set(None),
                    ..Default::default()
                }
                .insert(&txn)
                .await
                .map_err(|e| {
                    error!(order_id, error = %e, "Failed to create delivery");
                    ServiceError::DatabaseError(e)
                })?,
            };

            let mut sequence = 0;
            let mut created = Vec::new();
            for item in order_items(&txn, order_id).await?.into_iter().filter(|i| i.selected) {
                let plan = allocation::allocate(
                    &txn,
                    item.product_id,
                    Some(order.depot_id),
                    item.quantity,
                    item.batch_hint.as_deref(),
                    item.free_goods_quantity,
                )
                .await?;

                for pick in plan.picks {
                    sequence += 1;
                    let amounts = LineAmounts::compute(
                        pick.quantity,
                        item.trade_price,
                        item.discount_percent,
                        item.vat_percent,
                    );
                    let row = delivery_item::ActiveModel {
                        delivery_id: Set(header.id),
                        order_item_id: Set(item.id),
                        product_id: Set(item.product_id),
                        batch_detail_id: Set(pick.batch_id),
                        batch_number: Set(pick.batch_number),
                        expiry_date: Set(pick.expiry_date),
                        pick_sequence: Set(sequence),
                        ordered_quantity: Set(item.quantity),
                        picked_quantity: Set(pick.quantity),
                        delivered_quantity: Set(0),
                        returned_quantity: Set(0),
                        free_goods_quantity: Set(pick.free_goods),
                        trade_amount: Set(amounts.trade),
                        discount_amount: Set(amounts.discount),
                        tax_amount: Set(amounts.tax),
                        ..Default::default()
                    }
                    .insert(&txn)
                    .await?;
                    created.push(row);
                }
            }

            txn.commit().await?;
            Ok((header, created))
        })
        .await?;

        info!(delivery_id = model.id, order_id, picks = items.len(), "Delivery picked");
        self.event_sender
            .publish(Event::DeliveryCreated {
                delivery_id: model.id,
                order_id,
                picks: items.len(),
            })
            .await;
        DeliveryResponse::build(model, items)
    }

    #[instrument(skip(self))]
    pub async fn get_delivery(&self, delivery_id: i32) -> Result<DeliveryResponse, ServiceError> {
        let db = &*self.db_pool;
        let model = delivery::Entity::find_by_id(delivery_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Delivery {} not found", delivery_id)))?;
        let items = delivery_items(db, delivery_id).await?;
        DeliveryResponse::build(model, items)
    }

    /// Releases every reservation of a picked delivery.
    #[instrument(skip(self))]
    pub async fn cancel_delivery(&self, delivery_id: i32) -> Result<DeliveryResponse, ServiceError> {
        let (model, items) = transaction::bounded("deliveries.cancel", self.timeout, async {
            let txn = transaction::begin(&self.db_pool, self.timeout).await?;
            let header = lock_delivery(&txn, delivery_id).await?;
            let status = delivery_status(&header)?;
            if status != DeliveryStatus::Picked {
                return Err(ServiceError::invalid_state(
                    format!("delivery {}", delivery_id),
                    status.to_string(),
                    "Picked",
                ));
            }

            let items = delivery_items(&txn, delivery_id).await?;
            for item in &items {
                inventory_ledger::release(&txn, item.batch_detail_id, item.picked_quantity).await?;
            }

            let mut active: delivery::ActiveModel = header.into();
            active.status = Set(DeliveryStatus::Cancelled.to_string());
            active.cancelled_at = Set(Some(Utc::now()));
            let header = active.update(&txn).await?;
            txn.commit().await?;
            Ok((header, items))
        })
        .await?;

        info!(delivery_id, order_id = model.order_id, "Delivery cancelled");
        self.event_sender
            .publish(Event::DeliveryCancelled {
                delivery_id,
                order_id: model.order_id,
            })
            .await;
        DeliveryResponse::build(model, items)
    }

    /// Records delivered and returned units for every order of a loading.
    #[instrument(skip(self, request), fields(loading_number = %request.loading_number, source = %request.source))]
    pub async fn approve_delivery(
        &self,
        request: DeliveryApprovalRequest,
    ) -> Result<DeliveryApprovalOutcome, ServiceError> {
        request.validate()?;
        let mut outcomes: BTreeMap<String, (i32, i32)> = BTreeMap::new();
        for memo in &request.memos {
            memo.validate()?;
            if memo.delivered + memo.returned == 0 {
                return Err(ServiceError::ValidationError(format!(
                    "memo {} reports neither delivered nor returned units",
                    memo.memo_number
                )));
            }
            if outcomes
                .insert(memo.memo_number.clone(), (memo.delivered, memo.returned))
                .is_some()
            {
                return Err(ServiceError::ValidationError(format!(
                    "memo {} appears more than once",
                    memo.memo_number
                )));
            }
        }

        let source = request.source;
        let loading_number = request.loading_number.clone();
        let approved = transaction::bounded("deliveries.approve", self.timeout, async {
            let txn = transaction::begin(&self.db_pool, self.timeout).await?;

            let group_ids: Vec<i32> = order::Entity::find()
                .filter(order::Column::LoadingNumber.eq(loading_number.as_str()))
                .order_by_asc(order::Column::Id)
                .all(&txn)
                .await?
                .into_iter()
                .map(|o| o.id)
                .collect();
            if group_ids.is_empty() {
                return Err(ServiceError::NotFound(format!(
                    "Loading number {} not found",
                    loading_number
                )));
            }

            let mut group = Vec::with_capacity(group_ids.len());
            for order_id in group_ids {
                let (model, state) = lock_order(&txn, order_id).await?;
                if state.stage() != Stage::Assigned {
                    return Err(ServiceError::invalid_state(
                        describe(order_id),
                        state.stage().to_string(),
                        "Assigned",
                    ));
                }
                group.push((model, state));
            }

            let in_group: HashSet<String> = group
                .iter()
                .filter_map(|(_, state)| state.memo().map(|m| m.to_string()))
                .collect();
            let foreign: Vec<&String> = outcomes.keys().filter(|m| !in_group.contains(*m)).collect();
            if !foreign.is_empty() {
                return Err(ServiceError::ValidationError(format!(
                    "memos {:?} are not on loading {}",
                    foreign, loading_number
                )));
            }
            let absent: Vec<&String> = in_group.iter().filter(|m| !outcomes.contains_key(*m)).collect();
            if !absent.is_empty() {
                return Err(ServiceError::ValidationError(format!(
                    "loading {} is missing outcomes for memos {:?}",
                    loading_number, absent
                )));
            }

            let today = Utc::now().date_naive();
            let mut approved = Vec::with_capacity(group.len());
            for (model, state) in group {
                let entity = describe(model.id);
                let (memo, collector_id) = match &state {
                    OrderState::Assigned {
                        memo, assignment, ..
                    } => (memo.to_string(), assignment.employee_id),
                    other => {
                        return Err(ServiceError::invalid_state(
                            &entity,
                            other.stage().to_string(),
                            "Assigned",
                        ))
                    }
                };
                let (delivered, returned) = outcomes.get(&memo).copied().unwrap_or_default();

                let collection =
                    Collection::from_delivery(model.total_amount, delivered, returned, source)?;
                let stock_settled = settle_delivery(&txn, model.id, delivered, returned).await?;
                let next = state.deliver(&entity, collection.clone())?;
                let order_id = model.id;
                persist_state(&txn, model, &next, |active| {
                    active.postponed = Set(delivered == 0);
                    active.mobile_accepted = Set(source == CollectionSource::MobileApp);
                })
                .await?;

                collection_transaction::ActiveModel {
                    order_id: Set(order_id),
                    memo_number: Set(memo.clone()),
                    collector_id: Set(collector_id),
                    collection_date: Set(today),
                    source: Set(source.to_string()),
                    collected_amount: Set(collection.collected),
                    pending_amount: Set(collection.pending),
                    deposit_id: Set(None),
                    created_at: Set(Utc::now()),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;

                approved.push(ApprovedDelivery {
                    order_id,
                    memo_number: memo,
                    collection_status: collection.status,
                    collected_amount: collection.collected,
                    pending_amount: collection.pending,
                    stock_settled,
                });
            }

            txn.commit().await?;
            Ok(approved)
        })
        .await?;

        metrics::record_transition("deliver", approved.len() as u64);
        info!(loading_number = %request.loading_number, orders = approved.len(), "Delivery approved");
        self.event_sender
            .publish(Event::DeliveryApproved {
                loading_number: request.loading_number.clone(),
                order_ids: approved.iter().map(|a| a.order_id).collect(),
            })
            .await;
        Ok(DeliveryApprovalOutcome {
            loading_number: request.loading_number,
            orders: approved,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivered_units_fill_picks_in_order() {
        assert_eq!(split_outcome(&[30, 30], 45), vec![(30, 0), (15, 15)]);
        assert_eq!(split_outcome(&[30, 30], 0), vec![(0, 30), (0, 30)]);
        assert_eq!(split_outcome(&[10, 5, 5], 20), vec![(10, 0), (5, 0), (5, 0)]);
    }
}
