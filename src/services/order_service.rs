use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    checkout::{CheckoutInput, CheckoutOutcome, CheckoutPipeline, OrderReader, OrderTracker},
    dto::orders::{CheckoutRequest, OrderList, OrderWithItems},
    entity::orders::{Column as OrderCol, Entity as Orders},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::voucher_service::load_active_vouchers,
    state::AppState,
    store::SeaOrmOrderStore,
};

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(OrderCol::BuyerId.eq(user.user_id));
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = SeaOrmOrderStore::new(state.orm.clone())
        .fetch(user.user_id, id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success("OK", order, Some(Meta::empty())))
}

pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutOutcome>> {
    let store = SeaOrmOrderStore::new(state.orm.clone());
    let pipeline = CheckoutPipeline {
        carts: state.carts.as_ref(),
        submissions: state.submissions.as_ref(),
        store: &store,
        gateway: &state.gateway,
        opener: &state.redirect,
        fanout_policy: state.fanout_policy,
    };

    let vouchers = if payload.voucher_id.is_some() {
        load_active_vouchers(&state.orm).await?
    } else {
        Vec::new()
    };

    let input = CheckoutInput {
        buyer_id: user.user_id,
        buyer_name: payload.buyer_name,
        address: payload.address,
        payment_method: payload.payment_method,
        voucher_id: payload.voucher_id,
    };
    let outcome = pipeline.submit(input, vouchers, Utc::now()).await?;

    audit::record(
        &state.orm,
        user.user_id,
        AuditAction::Checkout,
        serde_json::json!({
            "order_id": outcome.order_id,
            "total": outcome.pricing.total,
            "state": outcome.state,
        }),
    )
    .await;

    let message = if outcome.warning.is_some() {
        "Order placed with warnings"
    } else {
        "Checkout success"
    };
    Ok(ApiResponse::success(message, outcome, Some(Meta::empty())))
}

/// Starts a live view of one of the buyer's orders.
pub async fn track_order(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<OrderTracker> {
    let reader = SeaOrmOrderStore::new(state.orm.clone());
    if reader.fetch(user.user_id, id).await?.is_none() {
        return Err(AppError::NotFound);
    }

    let mut tracker = OrderTracker::new(state.poll_interval);
    tracker.start(reader, user.user_id, id, Some(state.order_events.subscribe()));
    Ok(tracker)
}
