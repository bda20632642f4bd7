use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
};
use futures::{Stream, stream};
use tokio::sync::watch;
use uuid::Uuid;

use crate::{
    checkout::{CheckoutOutcome, OrderTracker, TrackedOrder},
    dto::orders::{CheckoutRequest, OrderList, OrderWithItems},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route("/checkout", post(checkout))
        .route("/{id}", get(get_order))
        .route("/{id}/track", get(track_order))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
        (status = 200, description = "Buyer's orders with normalized status", body = ApiResponse<OrderList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Order placed or gateway redirect issued", body = ApiResponse<CheckoutOutcome>),
        (status = 400, description = "Empty cart, missing address or ineligible voucher"),
        (status = 409, description = "A checkout is already in progress"),
        (status = 502, description = "Payment gateway unavailable; cash on delivery suggested"),
        (status = 503, description = "Order could not be created; safe to retry"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<Json<ApiResponse<CheckoutOutcome>>> {
    let resp = order_service::checkout(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order header and items", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = order_service::get_order(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}/track",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Server-sent `order` events whenever the order changes"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn track_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, axum::Error>>>> {
    let tracker = order_service::track_order(&state, &user, id).await?;
    Ok(Sse::new(tracking_events(tracker)).keep_alive(KeepAlive::default()))
}

struct TrackingView {
    // Owned by the stream so a closed connection stops the refresh task.
    _tracker: OrderTracker,
    updates: watch::Receiver<TrackedOrder>,
    finished: bool,
}

fn tracking_events(tracker: OrderTracker) -> impl Stream<Item = Result<Event, axum::Error>> {
    let view = TrackingView {
        updates: tracker.subscribe(),
        _tracker: tracker,
        finished: false,
    };

    stream::unfold(view, |mut view| async move {
        if view.finished || view.updates.changed().await.is_err() {
            return None;
        }
        let update = view.updates.borrow_and_update().clone();
        view.finished = update == TrackedOrder::Missing;
        Some((Event::default().event("order").json_data(&update), view))
    })
}
