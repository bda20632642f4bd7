use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    checkout::PaymentMethod,
    models::{Order, OrderItem},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub buyer_name: String,
    pub address: String,
    pub payment_method: PaymentMethod,
    pub voucher_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}
