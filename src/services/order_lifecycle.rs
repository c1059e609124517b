//! Order capture and the office side of the order lifecycle:
//! submit, item selection, validation, printing and assignment.
//!
//! Each operation runs in one bounded transaction, re-reads the order under a
//! row lock and converts it into [`OrderState`] before deciding anything.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, DbBackend, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::db::{transaction, DbPool};
use crate::entities::batch_detail::is_numeric_batch_number;
use crate::entities::{order, order_item};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::metrics;
use crate::models::order_state::{Assignment, MemoNumber, OrderState, PrintDecision, ValidationStep};
use crate::models::pricing::LineAmounts;
use crate::models::status::{CollectionSource, CollectionStatus, OrderStatus, Stage};
use crate::models::OrderSnapshot;
use crate::services::{allocation, free_goods, master_data, sequence};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderItemRequest {
    pub product_id: i32,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    /// Defaults to no discount
    pub discount_percent: Option<Decimal>,
    pub batch_hint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    pub customer_id: i32,
    pub route_id: i32,
    pub salesperson_id: i32,
    pub depot_id: i32,
    pub delivery_date: NaiveDate,
    #[validate(length(min = 1, message = "An order needs at least one item"))]
    pub items: Vec<CreateOrderItemRequest>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub free_goods_quantity: i32,
    pub trade_price: Decimal,
    pub discount_percent: Decimal,
    pub vat_percent: Decimal,
    pub batch_hint: Option<String>,
    pub selected: bool,
}

impl From<order_item::Model> for OrderItemResponse {
    fn from(item: order_item::Model) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id,
            quantity: item.quantity,
            free_goods_quantity: item.free_goods_quantity,
            trade_price: item.trade_price,
            discount_percent: item.discount_percent,
            vat_percent: item.vat_percent,
            batch_hint: item.batch_hint,
            selected: item.selected,
        }
    }
}

/// Order with its lifecycle state and the derived legacy flags.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: i32,
    pub customer_id: i32,
    pub route_id: i32,
    pub salesperson_id: i32,
    pub depot_id: i32,
    pub snapshot: OrderSnapshot,
    pub delivery_date: NaiveDate,
    pub state: OrderState,
    pub status: OrderStatus,
    pub validated: bool,
    pub printed: bool,
    pub loaded: bool,
    pub collection_approved: bool,
    pub postponed: bool,
    pub mobile_accepted: bool,
    pub memo_number: Option<String>,
    pub loading_number: Option<String>,
    pub total_amount: Decimal,
    pub collection_status: Option<CollectionStatus>,
    pub collection_source: Option<CollectionSource>,
    pub collected_amount: Option<Decimal>,
    pub pending_amount: Option<Decimal>,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemResponse>,
}

impl OrderResponse {
    pub fn build(model: order::Model, items: Vec<order_item::Model>) -> Result<Self, ServiceError> {
        let state = OrderState::try_from(&model)?;
        let collection = state.collection().cloned();
        Ok(Self {
            id: model.id,
            customer_id: model.customer_id,
            route_id: model.route_id,
            salesperson_id: model.salesperson_id,
            depot_id: model.depot_id,
            snapshot: OrderSnapshot::from_model(&model),
            delivery_date: model.delivery_date,
            status: state.status(),
            validated: state.is_validated(),
            printed: state.is_printed(),
            loaded: state.is_loaded(),
            collection_approved: state.is_collection_approved(),
            postponed: model.postponed,
            mobile_accepted: model.mobile_accepted,
            memo_number: state.memo().map(|m| m.to_string()),
            loading_number: state.assignment().map(|a| a.loading_number.clone()),
            total_amount: model.total_amount,
            collection_status: collection.as_ref().map(|c| c.status),
            collection_source: collection.as_ref().map(|c| c.source),
            collected_amount: collection.as_ref().map(|c| c.collected),
            pending_amount: collection.as_ref().map(|c| c.pending),
            remarks: model.remarks,
            created_at: model.created_at,
            items: items.into_iter().map(OrderItemResponse::from).collect(),
            state,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ValidationOutcome {
    pub order_id: i32,
    pub stage: Stage,
    pub memo_number: Option<String>,
    /// False when the order was already validated
    pub changed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PrintOutcome {
    pub printed: Vec<i32>,
    /// Already printed or further along
    pub skipped: Vec<i32>,
    /// Not validated yet
    pub ineligible: Vec<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssignmentOutcome {
    pub loading_number: String,
    pub loading_date: NaiveDate,
    pub employee_id: i32,
    pub vehicle_id: i32,
    pub order_ids: Vec<i32>,
}

pub(crate) fn describe(order_id: i32) -> String {
    format!("order {}", order_id)
}

/// Loads an order under a row lock and decodes its state.
pub(crate) async fn lock_order(
    txn: &DatabaseTransaction,
    order_id: i32,
) -> Result<(order::Model, OrderState), ServiceError> {
    let mut query = order::Entity::find_by_id(order_id);
    if txn.get_database_backend() != DbBackend::Sqlite {
        query = query.lock_exclusive();
    }
    let model = query
        .one(txn)
        .await
        .map_err(|e| {
            error!(order_id, error = %e, "Failed to load order");
            ServiceError::DatabaseError(e)
        })?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
    let state = OrderState::try_from(&model)?;
    Ok((model, state))
}

/// Writes `state` onto the row; `extra` sets any non-state columns.
pub(crate) async fn persist_state<F>(
    txn: &DatabaseTransaction,
    model: order::Model,
    state: &OrderState,
    extra: F,
) -> Result<order::Model, ServiceError>
where
    F: FnOnce(&mut order::ActiveModel),
{
    let order_id = model.id;
    let mut active: order::ActiveModel = model.into();
    state.write_to(&mut active);
    extra(&mut active);
    active.update(txn).await.map_err(|e| {
        error!(order_id, error = %e, "Failed to update order");
        ServiceError::DatabaseError(e)
    })
}

pub(crate) async fn order_items<C: ConnectionTrait>(
    conn: &C,
    order_id: i32,
) -> Result<Vec<order_item::Model>, ServiceError> {
    Ok(order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .order_by_asc(order_item::Column::Id)
        .all(conn)
        .await?)
}

fn line_total(item: &order_item::Model) -> Decimal {
    LineAmounts::compute(
        item.quantity,
        item.trade_price,
        item.discount_percent,
        item.vat_percent,
    )
    .total()
}

/// Ids in request order with duplicates removed; an empty list is rejected.
pub(crate) fn distinct_ids(ids: &[i32], what: &str) -> Result<Vec<i32>, ServiceError> {
    if ids.is_empty() {
        return Err(ServiceError::ValidationError(format!(
            "at least one {} id is required",
            what
        )));
    }
    let mut seen = HashSet::new();
    Ok(ids.iter().copied().filter(|id| seen.insert(*id)).collect())
}

#[derive(Clone)]
pub struct OrderLifecycleService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    sequence: sequence::SequenceService,
    timeout: Duration,
}

impl OrderLifecycleService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        sequence: sequence::SequenceService,
        timeout: Duration,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            sequence,
            timeout,
        }
    }

    /// Captures a Draft order with the master-data snapshot and priced items.
    #[instrument(skip(self, request), fields(customer_id = request.customer_id, items = request.items.len()))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        request.validate()?;
        for item in &request.items {
            item.validate()?;
            if let Some(discount) = item.discount_percent {
                if discount < Decimal::ZERO || discount > Decimal::from(100) {
                    return Err(ServiceError::ValidationError(format!(
                        "discount {}% for product {} is outside 0..=100",
                        discount, item.product_id
                    )));
                }
            }
            if let Some(hint) = &item.batch_hint {
                if !is_numeric_batch_number(hint) {
                    return Err(ServiceError::ValidationError(format!(
                        "batch hint '{}' must be numeric",
                        hint
                    )));
                }
            }
        }

        let (model, items) = transaction::bounded("orders.create", self.timeout, async {
            let txn = transaction::begin(&self.db_pool, self.timeout).await?;

            let customer = master_data::customer(&txn, request.customer_id).await?;
            let route = master_data::route(&txn, request.route_id).await?;
            let salesperson = master_data::employee(&txn, request.salesperson_id).await?;
            master_data::depot(&txn, request.depot_id).await?;
            let snapshot = OrderSnapshot::capture(&customer, &route, &salesperson);

            let mut lines = Vec::with_capacity(request.items.len());
            for item in &request.items {
                let product = master_data::orderable_product(&txn, item.product_id).await?;
                allocation::check_orderable(&txn, product.id, Some(request.depot_id)).await?;
                lines.push((item, product));
            }

            let now = Utc::now();
            let mut active = order::ActiveModel {
                customer_id: Set(customer.id),
                route_id: Set(route.id),
                salesperson_id: Set(salesperson.id),
                depot_id: Set(request.depot_id),
                customer_name: Set(snapshot.customer_name().to_string()),
                customer_code: Set(snapshot.customer_code().to_string()),
                route_name: Set(snapshot.route_name().to_string()),
                route_code: Set(snapshot.route_code().map(str::to_string)),
                salesperson_name: Set(snapshot.salesperson_name().to_string()),
                salesperson_code: Set(snapshot.salesperson_code().to_string()),
                delivery_date: Set(request.delivery_date),
                total_amount: Set(Decimal::ZERO),
                postponed: Set(false),
                mobile_accepted: Set(false),
                remarks: Set(request.remarks.clone()),
                created_at: Set(now),
                updated_at: Set(None),
                ..Default::default()
            };
            OrderState::Draft.write_to(&mut active);
            let created = active.insert(&txn).await.map_err(|e| {
                error!(error = %e, "Failed to create order");
                ServiceError::DatabaseError(e)
            })?;

            let mut items = Vec::with_capacity(lines.len());
            for (item, product) in lines {
                let saved = order_item::ActiveModel {
                    order_id: Set(created.id),
                    product_id: Set(product.id),
                    quantity: Set(item.quantity),
                    free_goods_quantity: Set(free_goods::bonus_for_product(&product, item.quantity)),
                    trade_price: Set(product.trade_price),
                    discount_percent: Set(item.discount_percent.unwrap_or(Decimal::ZERO)),
                    vat_percent: Set(product.vat_percent),
                    batch_hint: Set(item.batch_hint.clone()),
                    selected: Set(true),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
                items.push(saved);
            }

            let total: Decimal = items.iter().map(line_total).sum();
            let mut active: order::ActiveModel = created.into();
            active.total_amount = Set(total);
            let created = active.update(&txn).await?;

            txn.commit().await?;
            Ok((created, items))
        })
        .await?;

        info!(order_id = model.id, "Order created");
        metrics::record_transition("create", 1);
        self.event_sender.publish(Event::OrderCreated(model.id)).await;
        OrderResponse::build(model, items)
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: i32) -> Result<OrderResponse, ServiceError> {
        let db = &*self.db_pool;
        let model = order::Entity::find_by_id(order_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(order_id, error = %e, "Failed to fetch order");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        let items = order_items(db, order_id).await?;
        OrderResponse::build(model, items)
    }

    /// Deletes an order that has no memo number yet.
    #[instrument(skip(self))]
    pub async fn delete_order(&self, order_id: i32) -> Result<(), ServiceError> {
        transaction::bounded("orders.delete", self.timeout, async {
            let txn = transaction::begin(&self.db_pool, self.timeout).await?;
            let (model, state) = lock_order(&txn, order_id).await?;
            if !state.is_deletable() {
                return Err(ServiceError::invalid_state(
                    describe(order_id),
                    state.stage().to_string(),
                    "Draft, Submitted or PartiallyApproved without memo",
                ));
            }
            order_item::Entity::delete_many()
                .filter(order_item::Column::OrderId.eq(order_id))
                .exec(&txn)
                .await?;
            order::Entity::delete_by_id(model.id).exec(&txn).await?;
            txn.commit().await?;
            Ok(())
        })
        .await?;

        info!(order_id, "Order deleted");
        self.event_sender.publish(Event::OrderDeleted(order_id)).await;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn submit_order(&self, order_id: i32) -> Result<OrderResponse, ServiceError> {
        let (model, items) = transaction::bounded("orders.submit", self.timeout, async {
            let txn = transaction::begin(&self.db_pool, self.timeout).await?;
            let (model, state) = lock_order(&txn, order_id).await?;
            let next = state.submit(&describe(order_id))?;
            let model = persist_state(&txn, model, &next, |_| {}).await?;
            let items = order_items(&txn, order_id).await?;
            txn.commit().await?;
            Ok((model, items))
        })
        .await?;

        metrics::record_transition("submit", 1);
        self.event_sender.publish(Event::OrderSubmitted(order_id)).await;
        OrderResponse::build(model, items)
    }

    /// Marks exactly `item_ids` as selected; every other item of the order is deselected.
    #[instrument(skip(self))]
    pub async fn select_items(
        &self,
        order_id: i32,
        item_ids: Vec<i32>,
    ) -> Result<OrderResponse, ServiceError> {
        let wanted: BTreeSet<i32> = distinct_ids(&item_ids, "item")?.into_iter().collect();

        let (model, items) = transaction::bounded("orders.select_items", self.timeout, async {
            let txn = transaction::begin(&self.db_pool, self.timeout).await?;
            let (model, state) = lock_order(&txn, order_id).await?;
            state.ensure_selectable(&describe(order_id))?;

            let items = order_items(&txn, order_id).await?;
            let known: BTreeSet<i32> = items.iter().map(|i| i.id).collect();
            let foreign: Vec<i32> = wanted.difference(&known).copied().collect();
            if !foreign.is_empty() {
                return Err(ServiceError::ValidationError(format!(
                    "items {:?} do not belong to order {}",
                    foreign, order_id
                )));
            }

            let mut updated = Vec::with_capacity(items.len());
            for item in items {
                let selected = wanted.contains(&item.id);
                if item.selected == selected {
                    updated.push(item);
                    continue;
                }
                let mut active: order_item::ActiveModel = item.into();
                active.selected = Set(selected);
                updated.push(active.update(&txn).await?);
            }
            txn.commit().await?;
            Ok((model, updated))
        })
        .await?;

        OrderResponse::build(model, items)
    }

    /// Validates a batch of orders, issuing memo numbers on first validation.
    ///
    /// `requested_memo` is used for the first order that needs a memo, when
    /// no other order holds it yet.
    #[instrument(skip(self))]
    pub async fn validate_orders(
        &self,
        order_ids: Vec<i32>,
        requested_memo: Option<String>,
    ) -> Result<Vec<ValidationOutcome>, ServiceError> {
        let order_ids = distinct_ids(&order_ids, "order")?;
        let requested = requested_memo
            .as_deref()
            .map(MemoNumber::parse)
            .transpose()?;

        let outcomes = transaction::bounded("orders.validate", self.timeout, async {
            let txn = transaction::begin(&self.db_pool, self.timeout).await?;
            let mut requested = requested;
            let mut outcomes = Vec::with_capacity(order_ids.len());

            for order_id in &order_ids {
                let entity = describe(*order_id);
                let (model, state) = lock_order(&txn, *order_id).await?;
                let items = order_items(&txn, *order_id).await?;
                let selected: Vec<&order_item::Model> = items.iter().filter(|i| i.selected).collect();

                let total: Decimal = selected.iter().map(|i| line_total(i)).sum();

                match state.plan_validation(&entity, selected.len(), items.len())? {
                    ValidationStep::NoOp => {
                        // A new partial selection reprices the order without a transition
                        if state.stage() == Stage::PartiallyApproved && model.total_amount != total {
                            persist_state(&txn, model, &state, |active| {
                                active.total_amount = Set(total);
                            })
                            .await?;
                        }
                        outcomes.push(ValidationOutcome {
                            order_id: *order_id,
                            stage: state.stage(),
                            memo_number: state.memo().map(|m| m.to_string()),
                            changed: false,
                        });
                    }
                    ValidationStep::Apply { full, needs_memo } => {
                        let memo = if needs_memo {
                            Some(self.sequence.next_memo(&txn, requested.take().as_ref()).await?)
                        } else {
                            None
                        };
                        let next = state.validate(&entity, full, memo)?;
                        persist_state(&txn, model, &next, |active| {
                            active.total_amount = Set(total);
                        })
                        .await?;
                        outcomes.push(ValidationOutcome {
                            order_id: *order_id,
                            stage: next.stage(),
                            memo_number: next.memo().map(|m| m.to_string()),
                            changed: true,
                        });
                    }
                }
            }

            txn.commit().await?;
            Ok(outcomes)
        })
        .await?;

        for outcome in outcomes.iter().filter(|o| o.changed) {
            let full = outcome.stage == Stage::Validated;
            metrics::record_transition(if full { "validate" } else { "partially_approve" }, 1);
            self.event_sender
                .publish(Event::OrderValidated {
                    order_id: outcome.order_id,
                    memo_number: outcome.memo_number.clone(),
                    full,
                })
                .await;
        }
        info!(
            orders = outcomes.len(),
            changed = outcomes.iter().filter(|o| o.changed).count(),
            "Validation finished"
        );
        Ok(outcomes)
    }

    /// Prints validated orders; anything else is reported, not rejected.
    #[instrument(skip(self))]
    pub async fn print_orders(&self, order_ids: Vec<i32>) -> Result<PrintOutcome, ServiceError> {
        let order_ids = distinct_ids(&order_ids, "order")?;

        let outcome = transaction::bounded("orders.print", self.timeout, async {
            let txn = transaction::begin(&self.db_pool, self.timeout).await?;
            let now = Utc::now();
            let mut outcome = PrintOutcome::default();

            for order_id in &order_ids {
                let (model, state) = lock_order(&txn, *order_id).await?;
                match state.print_decision() {
                    PrintDecision::Print => {
                        let next = state.print(&describe(*order_id), now)?;
                        persist_state(&txn, model, &next, |_| {}).await?;
                        outcome.printed.push(*order_id);
                    }
                    PrintDecision::AlreadyPrinted => outcome.skipped.push(*order_id),
                    PrintDecision::NotValidated => outcome.ineligible.push(*order_id),
                }
            }

            txn.commit().await?;
            Ok(outcome)
        })
        .await?;

        metrics::record_transition("print", outcome.printed.len() as u64);
        if !outcome.printed.is_empty() {
            self.event_sender
                .publish(Event::OrdersPrinted {
                    order_ids: outcome.printed.clone(),
                })
                .await;
        }
        Ok(outcome)
    }

    /// Puts printed orders on one loading number for an employee and vehicle.
    #[instrument(skip(self))]
    pub async fn assign_orders(
        &self,
        order_ids: Vec<i32>,
        employee_id: i32,
        vehicle_id: i32,
    ) -> Result<AssignmentOutcome, ServiceError> {
        let order_ids = distinct_ids(&order_ids, "order")?;

        let outcome = transaction::bounded("orders.assign", self.timeout, async {
            let txn = transaction::begin(&self.db_pool, self.timeout).await?;
            master_data::employee(&txn, employee_id).await?;
            master_data::vehicle(&txn, vehicle_id).await?;

            let mut orders = Vec::with_capacity(order_ids.len());
            let mut missing = Vec::new();
            for order_id in &order_ids {
                match lock_order(&txn, *order_id).await {
                    Ok(loaded) => orders.push(loaded),
                    Err(ServiceError::NotFound(_)) => missing.push(*order_id),
                    Err(e) => return Err(e),
                }
            }
            if !missing.is_empty() {
                return Err(ServiceError::NotFound(format!("Orders {:?} not found", missing)));
            }
            for (model, state) in &orders {
                if state.stage() != Stage::Printed {
                    return Err(ServiceError::invalid_state(
                        describe(model.id),
                        state.stage().to_string(),
                        "Printed",
                    ));
                }
            }

            let route_ids: BTreeSet<i32> = orders.iter().map(|(m, _)| m.route_id).collect();
            let route_codes = if route_ids.len() > 1 {
                let mut codes = Vec::with_capacity(orders.len());
                for (model, _) in &orders {
                    match model.route_code.as_deref().map(str::trim) {
                        Some(code) if !code.is_empty() => codes.push(code.to_string()),
                        _ => {
                            return Err(ServiceError::ValidationError(format!(
                                "route '{}' of order {} has no route code",
                                model.route_name, model.id
                            )))
                        }
                    }
                }
                codes
            } else {
                Vec::new()
            };

            let loading_date = Utc::now().date_naive();
            let base = self.sequence.next_loading_number(&txn, loading_date).await?;
            let loading_number = sequence::with_route_suffix(&base, &route_codes);

            for (model, state) in orders {
                let entity = describe(model.id);
                let next = state.assign(
                    &entity,
                    Assignment {
                        employee_id,
                        vehicle_id,
                        loading_number: loading_number.clone(),
                        loading_date,
                    },
                )?;
                persist_state(&txn, model, &next, |_| {}).await?;
            }

            txn.commit().await?;
            Ok(AssignmentOutcome {
                loading_number,
                loading_date,
                employee_id,
                vehicle_id,
                order_ids: order_ids.clone(),
            })
        })
        .await?;

        metrics::record_transition("assign", outcome.order_ids.len() as u64);
        info!(loading_number = %outcome.loading_number, orders = outcome.order_ids.len(), "Orders assigned");
        self.event_sender
            .publish(Event::OrdersAssigned {
                loading_number: outcome.loading_number.clone(),
                order_ids: outcome.order_ids.clone(),
                employee_id,
                vehicle_id,
            })
            .await;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn distinct_ids_keeps_first_occurrence() {
        assert_eq!(distinct_ids(&[3, 1, 3, 2, 1], "order").unwrap(), vec![3, 1, 2]);
        assert_matches!(distinct_ids(&[], "order"), Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn line_total_uses_discounted_vat() {
        let item = order_item::Model {
            id: 1,
            order_id: 1,
            product_id: 1,
            quantity: 10,
            free_goods_quantity: 0,
            trade_price: Decimal::new(1250, 2),
            discount_percent: Decimal::from(10),
            vat_percent: Decimal::from(15),
            batch_hint: None,
            selected: true,
        };
        assert_eq!(line_total(&item), Decimal::new(12938, 2));
    }
}
