pub mod health;
pub mod metrics;
pub mod search;
pub mod warmup;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::HwrError;

/// Wrapper that converts `HwrError` into an HTTP response.
pub struct ApiError(pub HwrError);

impl From<HwrError> for ApiError {
    fn from(e: HwrError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        let body = json!({
            "error": self.0.to_string(),
            "status": status,
        });
        (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            axum::Json(body),
        )
            .into_response()
    }
}
