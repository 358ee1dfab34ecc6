use axum::extract::rejection::{FormRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::{Form, Json};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::HwrError;
use crate::server::AppState;
use crate::types::SearchResult;

use super::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: Option<String>,
    /// Dataset version the client was built against.
    #[serde(default)]
    pub v: Option<String>,
}

impl SearchParams {
    /// Fill unset fields from `fallback`.
    fn or(self, fallback: SearchParams) -> SearchParams {
        SearchParams {
            query: self.query.or(fallback.query),
            v: self.v.or(fallback.v),
        }
    }
}

pub async fn search_get(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResult>, ApiError> {
    let params = url_params(params)?;
    run_search(&state, params).await
}

/// Form body fields take priority; the URL query string fills the rest.
/// A request without a form body is searched from the URL alone.
pub async fn search_post(
    State(state): State<AppState>,
    url: Result<Query<SearchParams>, QueryRejection>,
    form: Result<Form<SearchParams>, FormRejection>,
) -> Result<Json<SearchResult>, ApiError> {
    let url = url_params(url)?;
    let params = match form {
        Ok(Form(body)) => body.or(url),
        Err(FormRejection::InvalidFormContentType(_)) => url,
        Err(rejection) => {
            return Err(ApiError(HwrError::InvalidQuery(format!(
                "invalid form body: {}",
                rejection.body_text()
            ))))
        }
    };
    run_search(&state, params).await
}

fn url_params(
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<SearchParams, ApiError> {
    params.map(|Query(p)| p).map_err(|rejection| {
        ApiError(HwrError::InvalidQuery(format!(
            "invalid query string: {}",
            rejection.body_text()
        )))
    })
}

async fn run_search(state: &AppState, params: SearchParams) -> Result<Json<SearchResult>, ApiError> {
    let start = std::time::Instant::now();

    let query = match params.query {
        Some(q) if !q.is_empty() => q,
        _ => {
            record("invalid", start);
            return Err(ApiError(HwrError::InvalidQuery(
                "parameter 'query' is missing".into(),
            )));
        }
    };
    debug!(query = %query, "search query");

    let result = state
        .processor
        .handle_version(&query, params.v.as_deref())
        .await;
    match result {
        Ok(hits) => {
            record("ok", start);
            info!(
                results = hits.len(),
                elapsed_ms = start.elapsed().as_millis(),
                "query complete"
            );
            Ok(Json(hits))
        }
        Err(e) => {
            let status = if e.status_code() < 500 { "invalid" } else { "error" };
            record(status, start);
            if e.is_fatal() {
                warn!(error = %e, "query failed on dataset error");
            }
            Err(ApiError(e))
        }
    }
}

fn record(status: &str, start: std::time::Instant) {
    crate::metrics::QUERIES_TOTAL
        .with_label_values(&[status])
        .inc();
    crate::metrics::QUERY_DURATION
        .with_label_values(&[status])
        .observe(start.elapsed().as_secs_f64());
}
