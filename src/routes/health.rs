use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{response::ApiResponse, state::AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthData {
    pub status: String,
    pub service: String,
    pub version: String,
    /// Only set by the readiness probe.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_gateway: Option<String>,
}

impl HealthData {
    fn new(status: &str) -> Self {
        Self {
            status: status.to_string(),
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: None,
            payment_gateway: None,
        }
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Process is up", body = ApiResponse<HealthData>),
    ),
    tag = "Health"
)]
pub async fn health_check() -> Json<ApiResponse<HealthData>> {
    Json(ApiResponse::success("Health check", HealthData::new("ok"), None))
}

#[utoipa::path(
    get,
    path = "/health/ready",
    responses(
        (status = 200, description = "Database reachable", body = ApiResponse<HealthData>),
        (status = 503, description = "Database unreachable", body = ApiResponse<HealthData>),
    ),
    tag = "Health"
)]
pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<HealthData>>) {
    let db_ok = match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => true,
        Err(err) => {
            tracing::warn!(error = %err, "readiness probe: database unreachable");
            false
        }
    };

    let mut data = HealthData::new(if db_ok { "ok" } else { "degraded" });
    data.database = Some(if db_ok { "up" } else { "down" }.to_string());
    // Without a gateway, online checkout falls back to COD.
    data.payment_gateway = Some(
        if state.gateway.is_configured() {
            "configured"
        } else {
            "missing"
        }
        .to_string(),
    );

    let status = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(ApiResponse::success("Readiness check", data, None)))
}
