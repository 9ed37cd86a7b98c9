//! Currency math for cart and checkout totals.
//!
//! All rules live here so call sites never do their own rounding or
//! unit conversion.

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};

/// Orders with a subtotal strictly above this ship free.
pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(35, 0, 0, false, 0);

/// Flat shipping charge below the free-shipping threshold: 5.99.
pub const FLAT_SHIPPING: Decimal = Decimal::from_parts(599, 0, 0, false, 2);

/// Flat estimated tax rate: 0.08.
pub const TAX_RATE: Decimal = Decimal::from_parts(8, 0, 0, false, 2);

/// Converts a decimal currency amount to minor units (cents),
/// rounding half-up to the nearest minor unit.
pub fn to_minor_units(amount: Decimal) -> i64 {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(i64::MAX)
}

/// Rounds to two decimal places, half-up.
pub fn round2(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Shipping is free iff the subtotal is strictly greater than the
/// threshold; a subtotal of exactly 35 still pays flat shipping.
pub fn shipping(subtotal: Decimal) -> Decimal {
    if subtotal > FREE_SHIPPING_THRESHOLD {
        Decimal::ZERO
    } else {
        FLAT_SHIPPING
    }
}

pub fn tax(subtotal: Decimal) -> Decimal {
    round2(subtotal * TAX_RATE)
}

pub fn order_total(subtotal: Decimal) -> Decimal {
    subtotal + shipping(subtotal) + tax(subtotal)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn minor_units_round_half_up() {
        assert_eq!(to_minor_units(dec("19.99")), 1999);
        assert_eq!(to_minor_units(dec("0.005")), 1);
        assert_eq!(to_minor_units(dec("0.004")), 0);
        assert_eq!(to_minor_units(dec("35")), 3500);
    }

    #[test]
    fn shipping_boundary_at_threshold() {
        assert_eq!(shipping(dec("35")), FLAT_SHIPPING);
        assert_eq!(shipping(dec("35.01")), Decimal::ZERO);
        assert_eq!(shipping(dec("0")), FLAT_SHIPPING);
    }

    #[test]
    fn tax_is_rounded_to_cents() {
        assert_eq!(tax(dec("19.99")), dec("1.60"));
        assert_eq!(tax(dec("10")), dec("0.80"));
        // 12.49 * 0.08 = 0.9992 -> 1.00
        assert_eq!(tax(dec("12.49")), dec("1.00"));
    }

    #[test]
    fn order_total_sums_components() {
        let subtotal = dec("29.99");
        assert_eq!(
            order_total(subtotal),
            subtotal + dec("5.99") + dec("2.40")
        );

        let free = dec("50");
        assert_eq!(order_total(free), free + dec("4.00"));
    }
}
