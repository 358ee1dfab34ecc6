use serde::{Deserialize, Serialize, Serializer};

/// Identifier the index engine assigns to each stored vector. Doubles as the
/// row number in the label list.
pub type InternalId = usize;

/// Distance metric for vector comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    Cosine,
    #[default]
    Euclidean,
    DotProduct,
}

impl std::fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistanceMetric::Cosine => write!(f, "cosine"),
            DistanceMetric::Euclidean => write!(f, "euclidean"),
            DistanceMetric::DotProduct => write!(f, "dot_product"),
        }
    }
}

/// A raw engine hit: internal id and its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub id: InternalId,
    pub distance: f32,
}

/// A labeled hit. Serializes as a two-element array `[label, distance]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub label: String,
    pub distance: f32,
}

impl Serialize for SearchHit {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        (&self.label, self.distance).serialize(serializer)
    }
}

/// Ranked hits, ascending by distance.
pub type SearchResult = Vec<SearchHit>;

/// Lifecycle of the process-wide dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetState {
    Uninitialized,
    Loading,
    Ready,
    Failed,
}

impl std::fmt::Display for DatasetState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetState::Uninitialized => write!(f, "uninitialized"),
            DatasetState::Loading => write!(f, "loading"),
            DatasetState::Ready => write!(f, "ready"),
            DatasetState::Failed => write!(f, "failed"),
        }
    }
}
