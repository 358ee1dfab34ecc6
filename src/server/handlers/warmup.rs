use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::info;

use crate::server::AppState;
use crate::types::DistanceMetric;

use super::ApiError;

#[derive(Debug, Serialize)]
pub struct WarmupResponse {
    pub num_items: usize,
    pub dimension: usize,
    pub metric: DistanceMetric,
    /// Dataset version clients must send as `v`.
    pub v: String,
    pub dump_time: Option<f64>,
    pub loaded_at: String,
}

/// Force the dataset load and describe what was loaded.
pub async fn warmup(State(state): State<AppState>) -> Result<Json<WarmupResponse>, ApiError> {
    let dataset = state.processor.loader().get().await?;
    let index = dataset.index();
    info!(
        num_items = index.vector_count(),
        version = dataset.metadata().version(),
        "warmup complete"
    );

    Ok(Json(WarmupResponse {
        num_items: index.vector_count(),
        dimension: index.dimension(),
        metric: index.metric(),
        v: dataset.metadata().version().to_string(),
        dump_time: dataset.metadata().dump_time,
        loaded_at: dataset.loaded_at().to_rfc3339(),
    }))
}
