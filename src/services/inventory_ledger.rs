//! Inventory Ledger
//!
//! Batch-level quantity movements and the per (product, depot) aggregate.
//! Every function runs on the caller's transaction and performs a single
//! conditional UPDATE per row, re-asserting `quantity = available + reserved`
//! in the WHERE clause. A mutation that matches no row is diagnosed by
//! re-reading the batch.

use chrono::{NaiveDate, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use tracing::{debug, error, instrument};

use crate::entities::batch_detail::{self, is_numeric_batch_number, Entity as BatchDetail};
use crate::entities::inventory_stock::{self, Entity as InventoryStock};
use crate::errors::ServiceError;
use crate::metrics::LEDGER_MOVEMENTS;
use crate::models::status::BatchStatus;

/// Bucket an issue draws from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IssueFrom {
    /// Units reserved earlier by an allocation or transfer
    Reserved,
    /// Direct stock-out of free units
    Available,
}

fn ensure_positive(qty: i32, what: &str) -> Result<(), ServiceError> {
    if qty <= 0 {
        return Err(ServiceError::ValidationError(format!(
            "{} quantity must be positive, got {}",
            what, qty
        )));
    }
    Ok(())
}

fn balanced() -> sea_orm::sea_query::SimpleExpr {
    Expr::col(batch_detail::Column::Quantity).eq(
        Expr::col(batch_detail::Column::AvailableQuantity)
            .add(Expr::col(batch_detail::Column::ReservedQuantity)),
    )
}

/// Loads a batch by id.
pub async fn find_batch<C: ConnectionTrait>(
    conn: &C,
    batch_id: i32,
) -> Result<batch_detail::Model, ServiceError> {
    BatchDetail::find_by_id(batch_id)
        .one(conn)
        .await
        .map_err(|e| {
            error!(batch_id, error = %e, "Failed to load batch");
            ServiceError::DatabaseError(e)
        })?
        .ok_or_else(|| ServiceError::NotFound(format!("Batch {} not found", batch_id)))
}

/// Batches of a product with free units, row-locked where the backend supports it.
pub async fn lock_available_batches<C: ConnectionTrait>(
    conn: &C,
    product_id: i32,
    depot_id: Option<i32>,
) -> Result<Vec<batch_detail::Model>, ServiceError> {
    let mut query = BatchDetail::find()
        .filter(batch_detail::Column::ProductId.eq(product_id))
        .filter(batch_detail::Column::AvailableQuantity.gt(0))
        .order_by_asc(batch_detail::Column::Id);
    if let Some(depot_id) = depot_id {
        query = query.filter(batch_detail::Column::DepotId.eq(depot_id));
    }
    if conn.get_database_backend() != DbBackend::Sqlite {
        query = query.lock_exclusive();
    }
    query.all(conn).await.map_err(|e| {
        error!(product_id, error = %e, "Failed to lock batches");
        ServiceError::DatabaseError(e)
    })
}

/// Explains why a conditional batch update matched nothing.
async fn diagnose<C: ConnectionTrait>(
    conn: &C,
    batch_id: i32,
    requested: i32,
    bucket: IssueFrom,
) -> ServiceError {
    match find_batch(conn, batch_id).await {
        Ok(batch) if batch.quantity != batch.available_quantity + batch.reserved_quantity => {
            ServiceError::InternalError(format!(
                "batch {} is unbalanced: quantity {} != available {} + reserved {}",
                batch.id, batch.quantity, batch.available_quantity, batch.reserved_quantity
            ))
        }
        Ok(batch) => match bucket {
            IssueFrom::Available => ServiceError::InsufficientStock {
                product_id: batch.product_id,
                requested,
                available: batch.available_quantity,
            },
            IssueFrom::Reserved => ServiceError::ValidationError(format!(
                "batch {} has only {} reserved units, {} requested",
                batch.batch_number, batch.reserved_quantity, requested
            )),
        },
        Err(e) => e,
    }
}

/// Moves `qty` units of a batch from available to reserved.
#[instrument(skip(conn))]
pub async fn reserve<C: ConnectionTrait>(
    conn: &C,
    batch_id: i32,
    qty: i32,
) -> Result<(), ServiceError> {
    ensure_positive(qty, "reserve")?;

    let result = BatchDetail::update_many()
        .col_expr(
            batch_detail::Column::AvailableQuantity,
            Expr::col(batch_detail::Column::AvailableQuantity).sub(qty),
        )
        .col_expr(
            batch_detail::Column::ReservedQuantity,
            Expr::col(batch_detail::Column::ReservedQuantity).add(qty),
        )
        .col_expr(batch_detail::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(batch_detail::Column::Id.eq(batch_id))
        .filter(batch_detail::Column::AvailableQuantity.gte(qty))
        .filter(balanced())
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(diagnose(conn, batch_id, qty, IssueFrom::Available).await);
    }
    LEDGER_MOVEMENTS.with_label_values(&["reserve"]).inc();
    debug!(batch_id, qty, "Reserved batch units");
    Ok(())
}

/// Returns `qty` reserved units of a batch to available.
#[instrument(skip(conn))]
pub async fn release<C: ConnectionTrait>(
    conn: &C,
    batch_id: i32,
    qty: i32,
) -> Result<(), ServiceError> {
    ensure_positive(qty, "release")?;

    let result = BatchDetail::update_many()
        .col_expr(
            batch_detail::Column::ReservedQuantity,
            Expr::col(batch_detail::Column::ReservedQuantity).sub(qty),
        )
        .col_expr(
            batch_detail::Column::AvailableQuantity,
            Expr::col(batch_detail::Column::AvailableQuantity).add(qty),
        )
        .col_expr(batch_detail::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(batch_detail::Column::Id.eq(batch_id))
        .filter(batch_detail::Column::ReservedQuantity.gte(qty))
        .filter(balanced())
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(diagnose(conn, batch_id, qty, IssueFrom::Reserved).await);
    }
    LEDGER_MOVEMENTS.with_label_values(&["release"]).inc();
    debug!(batch_id, qty, "Released batch units");
    Ok(())
}

/// Takes `qty` units out of stock and books them on the aggregate.
#[instrument(skip(conn))]
pub async fn issue<C: ConnectionTrait>(
    conn: &C,
    batch_id: i32,
    qty: i32,
    from: IssueFrom,
) -> Result<(), ServiceError> {
    ensure_positive(qty, "issue")?;

    let bucket = match from {
        IssueFrom::Reserved => batch_detail::Column::ReservedQuantity,
        IssueFrom::Available => batch_detail::Column::AvailableQuantity,
    };
    let result = BatchDetail::update_many()
        .col_expr(bucket, Expr::col(bucket).sub(qty))
        .col_expr(
            batch_detail::Column::Quantity,
            Expr::col(batch_detail::Column::Quantity).sub(qty),
        )
        .col_expr(batch_detail::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(batch_detail::Column::Id.eq(batch_id))
        .filter(bucket.gte(qty))
        .filter(balanced())
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(diagnose(conn, batch_id, qty, from).await);
    }

    let batch = find_batch(conn, batch_id).await?;
    if batch.quantity == 0 {
        set_status(conn, batch_id, BatchStatus::Depleted).await?;
    }

    let result = InventoryStock::update_many()
        .col_expr(
            inventory_stock::Column::StockQty,
            Expr::col(inventory_stock::Column::StockQty).sub(qty),
        )
        .col_expr(
            inventory_stock::Column::TotalIssued,
            Expr::col(inventory_stock::Column::TotalIssued).add(qty),
        )
        .col_expr(inventory_stock::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(inventory_stock::Column::ProductId.eq(batch.product_id))
        .filter(inventory_stock::Column::DepotId.eq(batch.depot_id))
        .filter(inventory_stock::Column::StockQty.gte(qty))
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        return Err(ServiceError::InternalError(format!(
            "stock aggregate for product {} at depot {} cannot cover an issue of {}",
            batch.product_id, batch.depot_id, qty
        )));
    }

    LEDGER_MOVEMENTS.with_label_values(&["issue"]).inc();
    debug!(batch_id, qty, ?from, "Issued batch units");
    Ok(())
}

/// Goods received into a depot.
#[derive(Clone, Debug)]
pub struct Receipt {
    pub product_id: i32,
    pub depot_id: i32,
    pub batch_number: String,
    pub quantity: i32,
    pub expiry_date: Option<NaiveDate>,
    pub manufacturing_date: Option<NaiveDate>,
}

/// Adds units to a batch, creating the batch and the aggregate when missing.
#[instrument(skip(conn, receipt), fields(product_id = receipt.product_id, batch = %receipt.batch_number))]
pub async fn receive<C: ConnectionTrait>(
    conn: &C,
    receipt: &Receipt,
) -> Result<batch_detail::Model, ServiceError> {
    ensure_positive(receipt.quantity, "receive")?;
    if !is_numeric_batch_number(&receipt.batch_number) {
        return Err(ServiceError::ValidationError(format!(
            "batch number '{}' must be numeric",
            receipt.batch_number
        )));
    }
    let now = Utc::now();
    let qty = receipt.quantity;

    let existing = BatchDetail::find()
        .filter(batch_detail::Column::ProductId.eq(receipt.product_id))
        .filter(batch_detail::Column::DepotId.eq(receipt.depot_id))
        .filter(batch_detail::Column::BatchNumber.eq(receipt.batch_number.as_str()))
        .one(conn)
        .await?;

    let batch_id = match existing {
        Some(batch) => {
            let result = BatchDetail::update_many()
                .col_expr(
                    batch_detail::Column::AvailableQuantity,
                    Expr::col(batch_detail::Column::AvailableQuantity).add(qty),
                )
                .col_expr(
                    batch_detail::Column::Quantity,
                    Expr::col(batch_detail::Column::Quantity).add(qty),
                )
                .col_expr(
                    batch_detail::Column::Status,
                    Expr::value(BatchStatus::Active.to_string()),
                )
                .col_expr(batch_detail::Column::UpdatedAt, Expr::value(now))
                .filter(batch_detail::Column::Id.eq(batch.id))
                .filter(balanced())
                .exec(conn)
                .await?;
            if result.rows_affected == 0 {
                return Err(diagnose(conn, batch.id, qty, IssueFrom::Available).await);
            }
            if batch.expiry_date.is_none() && receipt.expiry_date.is_some() {
                let mut active: batch_detail::ActiveModel = find_batch(conn, batch.id).await?.into();
                active.expiry_date = Set(receipt.expiry_date);
                active.manufacturing_date = Set(receipt.manufacturing_date.or(batch.manufacturing_date));
                active.update(conn).await?;
            }
            batch.id
        }
        None => {
            let batch = batch_detail::ActiveModel {
                product_id: Set(receipt.product_id),
                depot_id: Set(receipt.depot_id),
                batch_number: Set(receipt.batch_number.clone()),
                quantity: Set(qty),
                available_quantity: Set(qty),
                reserved_quantity: Set(0),
                expiry_date: Set(receipt.expiry_date),
                manufacturing_date: Set(receipt.manufacturing_date),
                status: Set(BatchStatus::Active.to_string()),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(conn)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to create batch");
                ServiceError::DatabaseError(e)
            })?;
            batch.id
        }
    };

    ensure_aggregate(conn, receipt.product_id, receipt.depot_id).await?;
    InventoryStock::update_many()
        .col_expr(
            inventory_stock::Column::StockQty,
            Expr::col(inventory_stock::Column::StockQty).add(qty),
        )
        .col_expr(
            inventory_stock::Column::TotalReceived,
            Expr::col(inventory_stock::Column::TotalReceived).add(qty),
        )
        .col_expr(inventory_stock::Column::UpdatedAt, Expr::value(now))
        .filter(inventory_stock::Column::ProductId.eq(receipt.product_id))
        .filter(inventory_stock::Column::DepotId.eq(receipt.depot_id))
        .exec(conn)
        .await?;

    LEDGER_MOVEMENTS.with_label_values(&["receive"]).inc();
    find_batch(conn, batch_id).await
}

/// Corrects a batch by `delta` units (positive or negative).
#[instrument(skip(conn))]
pub async fn adjust<C: ConnectionTrait>(
    conn: &C,
    batch_id: i32,
    delta: i32,
    reason: &str,
) -> Result<batch_detail::Model, ServiceError> {
    if delta == 0 {
        return Err(ServiceError::ValidationError(
            "adjustment delta must not be zero".to_string(),
        ));
    }
    if reason.trim().is_empty() {
        return Err(ServiceError::ValidationError(
            "adjustment reason is required".to_string(),
        ));
    }

    let mut update = BatchDetail::update_many()
        .col_expr(
            batch_detail::Column::AvailableQuantity,
            Expr::col(batch_detail::Column::AvailableQuantity).add(delta),
        )
        .col_expr(
            batch_detail::Column::Quantity,
            Expr::col(batch_detail::Column::Quantity).add(delta),
        )
        .col_expr(batch_detail::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(batch_detail::Column::Id.eq(batch_id))
        .filter(balanced());
    if delta < 0 {
        update = update.filter(batch_detail::Column::AvailableQuantity.gte(-delta));
    }
    let result = update.exec(conn).await?;
    if result.rows_affected == 0 {
        return Err(diagnose(conn, batch_id, -delta, IssueFrom::Available).await);
    }

    let batch = find_batch(conn, batch_id).await?;
    let status = if batch.quantity == 0 {
        BatchStatus::Depleted
    } else {
        BatchStatus::Active
    };
    set_status(conn, batch_id, status).await?;

    ensure_aggregate(conn, batch.product_id, batch.depot_id).await?;
    let mut aggregate = InventoryStock::update_many()
        .col_expr(
            inventory_stock::Column::StockQty,
            Expr::col(inventory_stock::Column::StockQty).add(delta),
        )
        .col_expr(
            inventory_stock::Column::TotalAdjusted,
            Expr::col(inventory_stock::Column::TotalAdjusted).add(delta),
        )
        .col_expr(inventory_stock::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(inventory_stock::Column::ProductId.eq(batch.product_id))
        .filter(inventory_stock::Column::DepotId.eq(batch.depot_id));
    if delta < 0 {
        aggregate = aggregate.filter(inventory_stock::Column::StockQty.gte(-delta));
    }
    if aggregate.exec(conn).await?.rows_affected == 0 {
        return Err(ServiceError::InternalError(format!(
            "stock aggregate for product {} at depot {} would go negative",
            batch.product_id, batch.depot_id
        )));
    }

    LEDGER_MOVEMENTS.with_label_values(&["adjust"]).inc();
    debug!(batch_id, delta, reason, "Adjusted batch");
    find_batch(conn, batch_id).await
}

async fn set_status<C: ConnectionTrait>(
    conn: &C,
    batch_id: i32,
    status: BatchStatus,
) -> Result<(), ServiceError> {
    BatchDetail::update_many()
        .col_expr(batch_detail::Column::Status, Expr::value(status.to_string()))
        .filter(batch_detail::Column::Id.eq(batch_id))
        .exec(conn)
        .await?;
    Ok(())
}

async fn ensure_aggregate<C: ConnectionTrait>(
    conn: &C,
    product_id: i32,
    depot_id: i32,
) -> Result<(), ServiceError> {
    let existing = InventoryStock::find()
        .filter(inventory_stock::Column::ProductId.eq(product_id))
        .filter(inventory_stock::Column::DepotId.eq(depot_id))
        .one(conn)
        .await?;
    if existing.is_none() {
        inventory_stock::ActiveModel {
            product_id: Set(product_id),
            depot_id: Set(depot_id),
            stock_qty: Set(0),
            total_received: Set(0),
            total_issued: Set(0),
            total_adjusted: Set(0),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}

/// Aggregate row of a (product, depot), if stock was ever received there.
pub async fn find_aggregate<C: ConnectionTrait>(
    conn: &C,
    product_id: i32,
    depot_id: i32,
) -> Result<Option<inventory_stock::Model>, ServiceError> {
    Ok(InventoryStock::find()
        .filter(inventory_stock::Column::ProductId.eq(product_id))
        .filter(inventory_stock::Column::DepotId.eq(depot_id))
        .one(conn)
        .await?)
}
