use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, sea_query::Query,
};
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    dto::orders::OrderList,
    entity::{
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_staff},
    models::{Order, OrderItem},
    response::{ApiResponse, Meta},
    routes::admin::UpdateStatusRequest,
    routes::params::Pagination,
    state::AppState,
};

const MAX_STATUS_LEN: usize = 64;

/// Sets the free-text status of an order header. Sellers may only touch
/// orders that contain at least one of their items.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_staff(user)?;
    let status = validate_status(&payload.status)?;

    let existing = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if !user.is_admin() {
        let owned = OrderItems::find()
            .filter(
                Condition::all()
                    .add(OrderItemCol::OrderId.eq(id))
                    .add(OrderItemCol::SellerId.eq(user.user_id)),
            )
            .count(&state.orm)
            .await?;
        if owned == 0 {
            return Err(AppError::Forbidden);
        }
    }

    let mut active: OrderActive = existing.into();
    active.status = Set(status.clone());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    state.publish_order_changed(order.id);
    audit::record(
        &state.orm,
        user.user_id,
        AuditAction::OrderStatusUpdate,
        serde_json::json!({ "order_id": order.id, "status": status }),
    )
    .await;

    Ok(ApiResponse::success("Order updated", order.into(), None))
}

/// Sets the status of one order item. Sellers may only touch their own items.
pub async fn update_item_status(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
    payload: UpdateStatusRequest,
) -> AppResult<ApiResponse<OrderItem>> {
    ensure_staff(user)?;
    let status = validate_status(&payload.status)?;

    let existing = OrderItems::find_by_id(item_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if !user.is_admin() && existing.seller_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    let mut active: OrderItemActive = existing.into();
    active.status = Set(status.clone());
    active.updated_at = Set(Utc::now().into());
    let item = active.update(&state.orm).await?;

    state.publish_order_changed(item.order_id);
    audit::record(
        &state.orm,
        user.user_id,
        AuditAction::OrderItemStatusUpdate,
        serde_json::json!({
            "order_item_id": item.id,
            "order_id": item.order_id,
            "status": status,
        }),
    )
    .await;

    Ok(ApiResponse::success("Order item updated", item.into(), None))
}

/// Order headers with no item rows, left behind by a failed fan-out.
pub async fn list_orphan_orders(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = Orders::find()
        .filter(
            OrderCol::Id.not_in_subquery(
                Query::select()
                    .column(OrderItemCol::OrderId)
                    .from(OrderItems)
                    .to_owned(),
            ),
        )
        .order_by_desc(OrderCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(ApiResponse::success(
        "Orphaned orders",
        OrderList { items: orders },
        Some(Meta::new(page, limit, total)),
    ))
}

fn validate_status(status: &str) -> Result<String, AppError> {
    let status = status.trim();
    if status.is_empty() {
        return Err(AppError::Validation("status must not be empty".into()));
    }
    if status.chars().count() > MAX_STATUS_LEN {
        return Err(AppError::Validation(format!(
            "status must be at most {MAX_STATUS_LEN} characters"
        )));
    }
    Ok(status.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_trimmed_and_bounded() {
        assert_eq!(
            validate_status("  Out for delivery ").ok().as_deref(),
            Some("Out for delivery")
        );
        assert!(validate_status("   ").is_err());
        assert!(validate_status(&"x".repeat(65)).is_err());
    }
}
