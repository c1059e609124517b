use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "collection_deposits")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub collector_id: i32,
    pub deposit_date: NaiveDate,
    pub total_collected: Decimal,
    pub deposited_amount: Decimal,
    pub remaining_amount: Decimal,
    pub channel: String,
    pub approved: bool,
    pub approved_by: Option<i32>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::deposit_receipt::Entity")]
    DepositReceipt,
    #[sea_orm(has_many = "super::collection_transaction::Entity")]
    CollectionTransaction,
}

impl Related<super::deposit_receipt::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DepositReceipt.def()
    }
}

impl Related<super::collection_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CollectionTransaction.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
