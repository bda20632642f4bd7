use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    checkout::status::normalize,
    entity::{order_items, orders},
};

/// Order header as shown to buyers. `status` is normalized, `raw_status` is
/// the text last written by the seller, courier or gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub total_amount: i64,
    pub item_count: i32,
    pub summary_title: String,
    pub summary_image: Option<String>,
    pub payment_method: String,
    pub status: String,
    pub raw_status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub seller_id: Uuid,
    pub product_id: Uuid,
    pub title: String,
    pub image: Option<String>,
    pub quantity: i32,
    pub unit_price: i64,
    pub shipping_fee: i64,
    pub buyer_name: String,
    pub buyer_address: String,
    pub payment_method: String,
    pub status: String,
    pub raw_status: String,
    pub created_at: DateTime<Utc>,
}

impl From<orders::Model> for Order {
    fn from(model: orders::Model) -> Self {
        Order {
            id: model.id,
            buyer_id: model.buyer_id,
            total_amount: model.total_amount,
            item_count: model.item_count,
            summary_title: model.summary_title,
            summary_image: model.summary_image,
            payment_method: model.payment_method,
            status: normalize(&model.status).to_string(),
            raw_status: model.status,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<order_items::Model> for OrderItem {
    fn from(model: order_items::Model) -> Self {
        OrderItem {
            id: model.id,
            order_id: model.order_id,
            seller_id: model.seller_id,
            product_id: model.product_id,
            title: model.title,
            image: model.image,
            quantity: model.qty,
            unit_price: model.unit_price,
            shipping_fee: model.shipping_fee,
            buyer_name: model.buyer_name,
            buyer_address: model.buyer_address,
            payment_method: model.payment_method,
            status: normalize(&model.status).to_string(),
            raw_status: model.status,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
