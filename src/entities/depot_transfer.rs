use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "depot_transfers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub transfer_number: String,
    pub source_depot_id: i32,
    pub destination_depot_id: i32,
    pub status: String,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::depot_transfer_item::Entity")]
    DepotTransferItem,
}

impl Related<super::depot_transfer_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DepotTransferItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
