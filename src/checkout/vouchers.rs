use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percentage => "percentage",
            DiscountType::Fixed => "fixed",
        }
    }
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown discount type {0:?}")]
pub struct UnknownDiscountType(pub String);

impl FromStr for DiscountType {
    type Err = UnknownDiscountType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "percentage" => Ok(DiscountType::Percentage),
            "fixed" => Ok(DiscountType::Fixed),
            _ => Err(UnknownDiscountType(s.to_string())),
        }
    }
}

/// A voucher promotion. Managed by seller/admin tooling; read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Voucher {
    pub id: Uuid,
    /// `None` means platform-wide.
    pub owner_seller_id: Option<Uuid>,
    pub name: String,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub min_purchase: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub status: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl Voucher {
    pub fn is_within_window(&self, now: DateTime<Utc>) -> bool {
        self.start_date.is_none_or(|start| start <= now)
            && self.end_date.is_none_or(|end| end >= now)
    }

    pub fn is_usable_for_seller(&self, cart_seller_id: Option<Uuid>) -> bool {
        match self.owner_seller_id {
            None => true,
            Some(owner) => cart_seller_id == Some(owner),
        }
    }
}

/// Filters active voucher promotions down to the ones usable for a cart whose
/// first line belongs to `cart_seller_id`. Source order is preserved.
pub fn eligible_vouchers(
    vouchers: impl IntoIterator<Item = Voucher>,
    now: DateTime<Utc>,
    cart_seller_id: Option<Uuid>,
) -> Vec<Voucher> {
    vouchers
        .into_iter()
        .filter(|voucher| voucher.is_within_window(now))
        .filter(|voucher| voucher.is_usable_for_seller(cart_seller_id))
        .collect()
}
