use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Audit row for cash received against a deposit's remaining balance.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "deposit_receipts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub deposit_id: i32,
    pub amount: Decimal,
    pub remaining_after: Decimal,
    pub note: Option<String>,
    pub received_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::collection_deposit::Entity",
        from = "Column::DepositId",
        to = "super::collection_deposit::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Deposit,
}

impl Related<super::collection_deposit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deposit.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
