use chrono::NaiveDate;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "depot_transfer_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub transfer_id: i32,
    pub product_id: i32,
    /// Source batch the quantity is reserved on
    pub batch_detail_id: i32,
    pub batch_number: String,
    pub expiry_date: Option<NaiveDate>,
    pub manufacturing_date: Option<NaiveDate>,
    pub quantity: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::depot_transfer::Entity",
        from = "Column::TransferId",
        to = "super::depot_transfer::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    DepotTransfer,
}

impl Related<super::depot_transfer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DepotTransfer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
