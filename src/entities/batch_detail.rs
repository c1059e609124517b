use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One manufacturing lot of a product held at a depot.
///
/// `quantity == available_quantity + reserved_quantity` after every ledger mutation.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "batch_details")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub product_id: i32,
    pub depot_id: i32,
    pub batch_number: String,
    pub quantity: i32,
    pub available_quantity: i32,
    pub reserved_quantity: i32,
    pub expiry_date: Option<NaiveDate>,
    pub manufacturing_date: Option<NaiveDate>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// Legacy batches with non-numeric numbers never take part in allocation.
    pub fn has_numeric_batch_number(&self) -> bool {
        is_numeric_batch_number(&self.batch_number)
    }
}

pub fn is_numeric_batch_number(batch_number: &str) -> bool {
    !batch_number.is_empty() && batch_number.bytes().all(|b| b.is_ascii_digit())
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::is_numeric_batch_number;

    #[test]
    fn only_digit_strings_are_numeric_batches() {
        assert!(is_numeric_batch_number("240117"));
        assert!(is_numeric_batch_number("0007"));
        assert!(!is_numeric_batch_number(""));
        assert!(!is_numeric_batch_number("B-12"));
        assert!(!is_numeric_batch_number("12 "));
    }
}
