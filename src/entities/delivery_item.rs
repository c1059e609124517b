use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One (order item, batch) pick. An order item spans several rows when FEFO
/// allocation crosses batches; `pick_sequence` preserves allocation order.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "delivery_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub delivery_id: i32,
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

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::delivery::Entity",
        from = "Column::DeliveryId",
        to = "super::delivery::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Delivery,
}

impl Related<super::delivery::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Delivery.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
