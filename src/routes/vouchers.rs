use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::vouchers::VoucherList,
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::voucher_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/eligible", get(list_eligible))
}

#[utoipa::path(
    get,
    path = "/api/vouchers/eligible",
    responses(
        (status = 200, description = "Active vouchers usable for the current cart", body = ApiResponse<VoucherList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Vouchers"
)]
pub async fn list_eligible(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<VoucherList>>> {
    let resp = voucher_service::list_eligible(&state, &user).await?;
    Ok(Json(resp))
}
