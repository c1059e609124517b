use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

/// Persisted order row.
///
/// The lifecycle is stored flattened: `stage` names the variant of
/// [`crate::models::order_state::OrderState`] and the nullable columns carry
/// its payload. Conversion back into the sum type rejects combinations the
/// state machine cannot produce.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub customer_id: i32,
    pub route_id: i32,
    pub salesperson_id: i32,
    pub depot_id: i32,

    // Snapshot captured at creation
    pub customer_name: String,
    pub customer_code: String,
    pub route_name: String,
    pub route_code: Option<String>,
    pub salesperson_name: String,
    pub salesperson_code: String,

    pub delivery_date: NaiveDate,
    pub stage: String,
    #[sea_orm(unique)]
    pub memo_number: Option<String>,
    pub total_amount: Decimal,
    pub printed_at: Option<DateTime<Utc>>,
    pub assigned_employee_id: Option<i32>,
    pub assigned_vehicle_id: Option<i32>,
    pub loading_number: Option<String>,
    pub loading_date: Option<NaiveDate>,
    pub collection_status: Option<String>,
    pub collection_source: Option<String>,
    pub collected_amount: Option<Decimal>,
    pub pending_amount: Option<Decimal>,
    pub collection_approved_at: Option<DateTime<Utc>>,
    pub collection_approved_by: Option<i32>,
    pub postponed: bool,
    pub mobile_accepted: bool,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItem,
    #[sea_orm(has_one = "super::delivery::Entity")]
    Delivery,
    #[sea_orm(has_many = "super::collection_transaction::Entity")]
    CollectionTransaction,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

impl Related<super::delivery::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Delivery.def()
    }
}

impl Related<super::collection_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CollectionTransaction.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if !insert {
            self.updated_at = Set(Some(Utc::now()));
        }
        Ok(self)
    }
}
