use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::Serialize;
use utoipa::ToSchema;

use super::{
    cart::CartLine,
    vouchers::{DiscountType, Voucher},
};

/// Price breakdown for a cart, in the smallest currency unit.
/// Recomputed on every read, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct PricingResult {
    pub subtotal: i64,
    pub vat: i64,
    pub discount: i64,
    pub total: i64,
}

/// Value-added tax applied to the subtotal (12%).
pub fn vat_rate() -> Decimal {
    Decimal::new(12, 2)
}

/// Prices a cart. This checkout channel charges no shipping fee.
pub fn price(lines: &[CartLine], voucher: Option<&Voucher>) -> PricingResult {
    let subtotal = subtotal(lines);
    let vat = vat(subtotal);
    let discount = match voucher {
        Some(voucher) => discount(subtotal, voucher),
        None => 0,
    };
    let total = subtotal.saturating_add(vat).saturating_sub(discount).max(0);

    PricingResult {
        subtotal,
        vat,
        discount,
        total,
    }
}

pub fn subtotal(lines: &[CartLine]) -> i64 {
    lines
        .iter()
        .fold(0i64, |acc, line| acc.saturating_add(line.line_total()))
}

pub fn vat(subtotal: i64) -> i64 {
    round_to_unit(Decimal::from(subtotal) * vat_rate())
}

/// Voucher discount for a subtotal: never negative, zero for an empty subtotal.
/// `min_purchase` and `max_discount` are not applied.
pub fn discount(subtotal: i64, voucher: &Voucher) -> i64 {
    if subtotal <= 0 {
        return 0;
    }
    let raw = match voucher.discount_type {
        DiscountType::Percentage => {
            match Decimal::from(subtotal).checked_mul(voucher.discount_value) {
                Some(amount) => round_to_unit(amount / Decimal::ONE_HUNDRED),
                None if voucher.discount_value.is_sign_negative() => 0,
                None => i64::MAX,
            }
        }
        DiscountType::Fixed => round_to_unit(voucher.discount_value),
    };
    raw.max(0)
}

/// Rounds half away from zero to a whole currency unit, saturating at the i64 range.
pub fn round_to_unit(amount: Decimal) -> i64 {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    rounded.to_i64().unwrap_or(if rounded.is_sign_negative() {
        i64::MIN
    } else {
        i64::MAX
    })
}
