use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::{ForecastRequest, ForecastRequestPayload, ForecastResult};
use crate::services::transaction_source::RecordFilter;
use crate::state::AppState;

pub const ORG_HEADER: &str = "x-org-id";

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(create_forecast))
}

fn org_id(headers: &HeaderMap) -> Result<i64, AppError> {
    headers
        .get(ORG_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<i64>().ok())
        .ok_or(AppError::Unauthorized)
}

pub async fn create_forecast(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ForecastRequestPayload>, JsonRejection>,
) -> Result<Json<ForecastResult>, AppError> {
    let org_id = org_id(&headers)?;
    let Json(payload) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    info!("POST /api/forecast - org {} target={} horizon={}", org_id, payload.target, payload.horizon);

    let request = ForecastRequest::try_from(payload)?;
    let filter = RecordFilter::for_request(&request);

    let records = state
        .transactions
        .fetch_for_forecast(org_id, &filter)
        .await
        .map_err(|e| {
            error!("Failed to load transactions for org {}: {}", org_id, e);
            e
        })?;

    let result = state.forecasts.run(records, request).await?;
    Ok(Json(result))
}
