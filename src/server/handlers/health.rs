use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::server::AppState;
use crate::types::DatasetState;

/// Ready only once the dataset is loaded; a failed load stays unhealthy.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let dataset = state.processor.loader().state();
    let (code, status) = match dataset {
        DatasetState::Ready => (StatusCode::OK, "ok"),
        DatasetState::Loading => (StatusCode::SERVICE_UNAVAILABLE, "loading"),
        DatasetState::Failed => (StatusCode::SERVICE_UNAVAILABLE, "failed"),
        DatasetState::Uninitialized => (StatusCode::SERVICE_UNAVAILABLE, "uninitialized"),
    };
    (code, Json(json!({ "status": status, "dataset": dataset })))
}
