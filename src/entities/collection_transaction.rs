use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Cash collected against one order by one collector; linked to a deposit once reconciled.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "collection_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub order_id: i32,
    pub memo_number: String,
    pub collector_id: i32,
    pub collection_date: NaiveDate,
    pub source: String,
    pub collected_amount: Decimal,
    pub pending_amount: Decimal,
    pub deposit_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
    #[sea_orm(
        belongs_to = "super::collection_deposit::Entity",
        from = "Column::DepositId",
        to = "super::collection_deposit::Column::Id"
    )]
    Deposit,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::collection_deposit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deposit.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
