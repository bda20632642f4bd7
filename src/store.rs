//! SeaORM implementations of the checkout storage traits.

use chrono::Utc;
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    checkout::{
        OrderReader, OrderStore,
        fanout::{NewOrder, NewOrderItem, ORPHANED_STATUS},
    },
    dto::orders::OrderWithItems,
    entity::{
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
    },
    error::{AppError, AppResult},
};

/// Header and items are written with separate statements on the shared
/// connection, never inside one transaction.
#[derive(Debug, Clone)]
pub struct SeaOrmOrderStore {
    conn: DatabaseConnection,
}

impl SeaOrmOrderStore {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

impl OrderStore for SeaOrmOrderStore {
    async fn insert_order(&self, order: NewOrder) -> AppResult<()> {
        let active = OrderActive {
            id: Set(order.id),
            buyer_id: Set(order.buyer_id),
            total_amount: Set(order.total_amount),
            item_count: Set(order.item_count),
            summary_title: Set(order.summary_title),
            summary_image: Set(order.summary_image),
            payment_method: Set(order.payment_method.to_string()),
            status: Set(order.status),
            created_at: NotSet,
            updated_at: NotSet,
        };
        Orders::insert(active).exec_without_returning(&self.conn).await?;
        Ok(())
    }

    async fn insert_items(&self, items: Vec<NewOrderItem>) -> AppResult<()> {
        let rows = items.into_iter().map(|item| OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(item.order_id),
            seller_id: Set(item.seller_id),
            product_id: Set(item.product_id),
            title: Set(item.title),
            image: Set(item.image),
            qty: Set(item.quantity),
            unit_price: Set(item.unit_price),
            shipping_fee: Set(item.shipping_fee),
            buyer_name: Set(item.buyer_name),
            buyer_address: Set(item.buyer_address),
            payment_method: Set(item.payment_method.to_string()),
            status: Set(item.status),
            created_at: NotSet,
            updated_at: NotSet,
        });
        OrderItems::insert_many(rows)
            .exec_without_returning(&self.conn)
            .await?;
        Ok(())
    }

    async fn mark_orphaned(&self, order_id: Uuid) -> AppResult<()> {
        let result = Orders::update_many()
            .col_expr(OrderCol::Status, Expr::value(ORPHANED_STATUS))
            .col_expr(OrderCol::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
            .filter(OrderCol::Id.eq(order_id))
            .exec(&self.conn)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}

impl OrderReader for SeaOrmOrderStore {
    async fn fetch(&self, buyer_id: Uuid, order_id: Uuid) -> AppResult<Option<OrderWithItems>> {
        let order = Orders::find()
            .filter(
                Condition::all()
                    .add(OrderCol::BuyerId.eq(buyer_id))
                    .add(OrderCol::Id.eq(order_id)),
            )
            .one(&self.conn)
            .await?;
        let Some(order) = order else {
            return Ok(None);
        };

        let items = OrderItems::find()
            .filter(OrderItemCol::OrderId.eq(order.id))
            .order_by_asc(OrderItemCol::CreatedAt)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();

        Ok(Some(OrderWithItems {
            order: order.into(),
            items,
        }))
    }
}
