//! Promotional free goods: bonus units per threshold multiple of the ordered quantity.

use crate::entities::product;

/// `floor(ordered / threshold) * bonus`, or zero when the promotion is off.
pub fn bonus_units(ordered: i32, threshold: i32, bonus: i32) -> i32 {
    if ordered <= 0 || threshold <= 0 || bonus <= 0 {
        return 0;
    }
    (ordered / threshold).saturating_mul(bonus)
}

/// Bonus units a product awards for `ordered` units.
pub fn bonus_for_product(product: &product::Model, ordered: i32) -> i32 {
    bonus_units(
        ordered,
        product.free_goods_threshold,
        product.free_goods_quantity,
    )
}

/// Splits `total_bonus` across allocations in proportion to their quantities.
///
/// Every allocation but the last gets its share rounded down; the last one
/// absorbs the remainder, so the awards always sum to `total_bonus`.
pub fn distribute_bonus(total_bonus: i32, allocated: &[i32]) -> Vec<i32> {
    let Some(last) = allocated.len().checked_sub(1) else {
        return Vec::new();
    };
    let total_bonus = total_bonus.max(0);
    let allocated_sum: i64 = allocated.iter().map(|q| i64::from((*q).max(0))).sum();

    let mut awards = Vec::with_capacity(allocated.len());
    let mut awarded = 0i32;
    for (index, qty) in allocated.iter().enumerate() {
        let award = if index == last {
            total_bonus - awarded
        } else if allocated_sum == 0 {
            0
        } else {
            // fits in i32: the share never exceeds total_bonus
            (i64::from(total_bonus) * i64::from((*qty).max(0)) / allocated_sum) as i32
        };
        awarded += award;
        awards.push(award);
    }
    awards
}
