use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::checkout::{CartLine, PricingResult};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartLineRequest {
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CartQuery {
    pub voucher_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub item_count: i32,
    pub pricing: PricingResult,
    /// Voucher used for `pricing`, if the requested one is eligible.
    pub voucher_id: Option<Uuid>,
}
