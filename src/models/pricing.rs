use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use utoipa::ToSchema;

/// Rounds a money amount to cents, half away from zero.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Trade, discount and tax amounts for `quantity` units of one line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct LineAmounts {
    pub trade: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
}

impl LineAmounts {
    pub fn compute(
        quantity: i32,
        trade_price: Decimal,
        discount_percent: Decimal,
        vat_percent: Decimal,
    ) -> Self {
        let hundred = Decimal::from(100);
        let trade = round2(Decimal::from(quantity) * trade_price);
        let discount = round2(trade * discount_percent / hundred);
        let tax = round2((trade - discount) * vat_percent / hundred);
        Self {
            trade,
            discount,
            tax,
        }
    }

    /// Amount payable by the customer
    pub fn total(&self) -> Decimal {
        self.trade - self.discount + self.tax
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn line_amounts_apply_discount_before_vat() {
        let amounts = LineAmounts::compute(10, dec!(12.50), dec!(10), dec!(15));
        assert_eq!(amounts.trade, dec!(125.00));
        assert_eq!(amounts.discount, dec!(12.50));
        assert_eq!(amounts.tax, dec!(16.88));
        assert_eq!(amounts.total(), dec!(129.38));
    }

    #[test]
    fn round2_is_half_away_from_zero() {
        assert_eq!(round2(dec!(1.005)), dec!(1.01));
        assert_eq!(round2(dec!(2.344)), dec!(2.34));
    }
}
