use axum::{Json, Router, extract::State, http::HeaderMap, routing::post};
use chrono::Utc;

use crate::{
    dto::sellers::SweepOutcome,
    error::{AppError, AppResult},
    response::{ApiResponse, Meta},
    services::seller_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/subscription-sweep", post(subscription_sweep))
}

/// Invoked by an external scheduler. Guarded by a shared secret rather than
/// a user token; re-running is harmless.
#[utoipa::path(
    post,
    path = "/api/cron/subscription-sweep",
    params(
        ("x-cron-secret" = String, Header, description = "Shared scheduler secret")
    ),
    responses(
        (status = 200, description = "Sweep completed", body = ApiResponse<SweepOutcome>),
        (status = 403, description = "Missing or invalid secret"),
    ),
    tag = "Cron"
)]
pub async fn subscription_sweep(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<ApiResponse<SweepOutcome>>> {
    let expected = state
        .config
        .cron_secret
        .as_deref()
        .ok_or_else(|| AppError::Forbidden("cron endpoint is disabled".into()))?;
    let provided = headers
        .get("x-cron-secret")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if provided != expected {
        return Err(AppError::Forbidden("invalid cron secret".into()));
    }

    let outcome = seller_service::expire_sweep(&state, Utc::now()).await?;
    Ok(Json(ApiResponse::success(
        "Sweep completed",
        outcome,
        Some(Meta::empty()),
    )))
}
