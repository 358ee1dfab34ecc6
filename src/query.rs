use std::sync::Arc;

use tracing::{debug, error, instrument};

use crate::dataset::metadata::DEFAULT_VERSION;
use crate::dataset::{Dataset, DatasetLoader, LabelList};
use crate::error::{HwrError, Result};
use crate::types::{Neighbor, SearchHit, SearchResult};

/// Number of hits returned per query.
pub const RESULT_COUNT: usize = 20;

/// Parse whitespace-separated decimal tokens into a query vector.
///
/// Any token that is not a finite float rejects the whole query, as does a
/// query with no tokens at all.
pub fn parse_query(text: &str) -> Result<Vec<f32>> {
    let values = text
        .split_whitespace()
        .map(parse_token)
        .collect::<Result<Vec<f32>>>()?;

    if values.is_empty() {
        return Err(HwrError::InvalidQuery("query is empty".into()));
    }
    Ok(values)
}

fn parse_token(token: &str) -> Result<f32> {
    match token.parse::<f32>() {
        Ok(value) if value.is_finite() => Ok(value),
        // Finite as a decimal, but too large for f32.
        Ok(_) if token.parse::<f64>().is_ok_and(f64::is_finite) => Err(HwrError::InvalidQuery(
            format!("value out of range: {token:?}"),
        )),
        Ok(_) => Err(HwrError::InvalidQuery(format!(
            "not a finite number: {token:?}"
        ))),
        Err(_) => Err(HwrError::InvalidQuery(format!("not a number: {token:?}"))),
    }
}

/// Zero-pad `query` up to `dimension`. Longer queries are rejected.
pub fn fit_dimension(mut query: Vec<f32>, dimension: usize) -> Result<Vec<f32>> {
    if query.len() > dimension {
        return Err(HwrError::DimensionMismatch {
            expected: dimension,
            actual: query.len(),
        });
    }
    query.resize(dimension, 0.0);
    Ok(query)
}

/// Attach labels to engine hits, keeping the engine's order.
pub fn resolve_labels(labels: &LabelList, neighbors: &[Neighbor]) -> Result<SearchResult> {
    neighbors
        .iter()
        .map(|n| {
            Ok(SearchHit {
                label: labels.resolve(n.id)?.to_string(),
                distance: n.distance,
            })
        })
        .collect()
}

/// Run a parsed query against an opened dataset.
pub fn search_dataset(dataset: &Dataset, query: Vec<f32>, k: usize) -> Result<SearchResult> {
    let index = dataset.index();
    let query = fit_dimension(query, index.dimension())?;
    let neighbors = index.search(&query, k)?;
    if neighbors.iter().any(|n| !n.distance.is_finite()) {
        return Err(HwrError::InvalidQuery(
            "query values out of range: distances overflow".into(),
        ));
    }
    resolve_labels(dataset.labels(), &neighbors)
}

/// Fail with `VersionMismatch` unless `version` is the dataset's version.
pub fn check_version(dataset: &Dataset, version: &str) -> Result<()> {
    let expected = dataset.metadata().version();
    if version != expected {
        return Err(HwrError::VersionMismatch {
            expected: expected.to_string(),
            actual: version.to_string(),
        });
    }
    Ok(())
}

/// Turns query text into ranked, labeled results.
#[derive(Debug, Clone)]
pub struct QueryProcessor {
    loader: Arc<DatasetLoader>,
    result_count: usize,
}

impl QueryProcessor {
    pub fn new(loader: Arc<DatasetLoader>) -> Self {
        Self {
            loader,
            result_count: RESULT_COUNT,
        }
    }

    pub fn loader(&self) -> &Arc<DatasetLoader> {
        &self.loader
    }

    /// Parse, search and label, assuming the client speaks the default
    /// dataset version.
    pub async fn handle(&self, text: &str) -> Result<SearchResult> {
        self.handle_version(text, None).await
    }

    /// Parse, search and label. The query is validated before the dataset
    /// is touched, so a malformed query never waits on the load or reaches
    /// the index. A client `version` that differs from the dataset's is
    /// refused once the dataset is loaded.
    #[instrument(skip(self, text), fields(query_len = text.len()))]
    pub async fn handle_version(&self, text: &str, version: Option<&str>) -> Result<SearchResult> {
        let query = parse_query(text)?;
        let dataset = self.loader.get().await?;
        check_version(&dataset, version.unwrap_or(DEFAULT_VERSION))?;
        let k = self.result_count;

        let result = tokio::task::spawn_blocking(move || search_dataset(&dataset, query, k))
            .await
            .map_err(|e| HwrError::Internal(format!("search task failed: {e}")))?;

        match &result {
            Ok(hits) => debug!(results = hits.len(), "query resolved"),
            Err(e @ HwrError::Consistency(_)) => {
                error!(error = %e, "index and labels disagree");
            }
            Err(_) => {}
        }
        result
    }
}
