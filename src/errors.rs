use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Failures of the forecasting core. Each variant has a stable `code`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecastError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Data(String),
    #[error("{0}")]
    Computation(String),
    #[error("{0}")]
    ModelUnavailable(String),
    #[error("Forecast computation was cancelled")]
    Cancelled,
}

impl ForecastError {
    pub fn code(&self) -> &'static str {
        match self {
            ForecastError::Validation(_) => "validation_error",
            ForecastError::Data(_) => "data_error",
            ForecastError::Computation(_) => "computation_error",
            ForecastError::ModelUnavailable(_) => "model_unavailable",
            ForecastError::Cancelled => "cancelled",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ForecastError::Validation(_) | ForecastError::Data(_) => StatusCode::BAD_REQUEST,
            ForecastError::Computation(_) | ForecastError::ModelUnavailable(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ForecastError::Cancelled => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Db(sqlx::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forecast timed out after {0} seconds")]
    Timeout(u64),
    #[error("Internal error: {0}")]
    Internal(String),
    #[error(transparent)]
    Forecast(#[from] ForecastError),
}

/// JSON error body returned by every endpoint
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
    pub code: String,
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Forecast(e) => (e.status(), e.code(), e.to_string()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg.clone()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Missing or invalid organization id".to_string(),
            ),
            AppError::Timeout(secs) => (
                StatusCode::GATEWAY_TIMEOUT,
                "timeout",
                format!("Forecast did not finish within {} seconds", secs),
            ),
            AppError::Db(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error".to_string(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        if matches!(self, AppError::Db(_) | AppError::Internal(_)) {
            error!("{}", self);
        }
        let (status, code, message) = self.parts();
        (
            status,
            Json(MessageResponse {
                message,
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(value: sqlx::Error) -> Self {
        AppError::Db(value)
    }
}
