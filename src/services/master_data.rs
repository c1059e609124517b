//! Read-only lookups of master data referenced by orders, deliveries and transfers.

use sea_orm::{ConnectionTrait, EntityTrait, PrimaryKeyTrait};
use tracing::error;

use crate::entities::{customer, depot, employee, product, route, vehicle};
use crate::errors::ServiceError;

async fn require<E, C>(conn: &C, id: i32, label: &str) -> Result<E::Model, ServiceError>
where
    E: EntityTrait,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<i32>,
    C: ConnectionTrait,
{
    E::find_by_id(id)
        .one(conn)
        .await
        .map_err(|e| {
            error!(id, entity = label, error = %e, "Failed to load master data");
            ServiceError::DatabaseError(e)
        })?
        .ok_or_else(|| ServiceError::NotFound(format!("{} {} not found", label, id)))
}

pub async fn customer<C: ConnectionTrait>(conn: &C, id: i32) -> Result<customer::Model, ServiceError> {
    require::<customer::Entity, _>(conn, id, "Customer").await
}

pub async fn route<C: ConnectionTrait>(conn: &C, id: i32) -> Result<route::Model, ServiceError> {
    require::<route::Entity, _>(conn, id, "Route").await
}

pub async fn employee<C: ConnectionTrait>(conn: &C, id: i32) -> Result<employee::Model, ServiceError> {
    require::<employee::Entity, _>(conn, id, "Employee").await
}

pub async fn vehicle<C: ConnectionTrait>(conn: &C, id: i32) -> Result<vehicle::Model, ServiceError> {
    require::<vehicle::Entity, _>(conn, id, "Vehicle").await
}

pub async fn depot<C: ConnectionTrait>(conn: &C, id: i32) -> Result<depot::Model, ServiceError> {
    require::<depot::Entity, _>(conn, id, "Depot").await
}

pub async fn product<C: ConnectionTrait>(conn: &C, id: i32) -> Result<product::Model, ServiceError> {
    require::<product::Entity, _>(conn, id, "Product").await
}

/// Inactive products cannot be ordered.
pub async fn orderable_product<C: ConnectionTrait>(
    conn: &C,
    id: i32,
) -> Result<product::Model, ServiceError> {
    let product = product(conn, id).await?;
    if !product.active {
        return Err(ServiceError::ValidationError(format!(
            "product {} ({}) is inactive",
            product.id, product.code
        )));
    }
    Ok(product)
}
