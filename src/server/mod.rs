pub mod handlers;
pub mod routes;

use std::sync::Arc;

use crate::config::Config;
use crate::query::QueryProcessor;

/// Shared application state injected into all handlers via axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    pub processor: QueryProcessor,
    pub config: Arc<Config>,
}
