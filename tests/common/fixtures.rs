use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use hwr_search::dataset::DatasetDir;
use hwr_search::error::{HwrError, Result};
use hwr_search::fetch::ArtifactSource;
use hwr_search::index::{FlatIndex, VectorIndex};
use hwr_search::types::{DistanceMetric, Neighbor};

pub const THREE_LABELS: [&str; 3] = ["alice", "bob", "carol"];

/// Write `anng/` and `names.txt` under `dir`.
pub fn write_dataset<S: AsRef<str>>(dir: &Path, vectors: &[Vec<f32>], labels: &[S]) {
    FlatIndex::write(&dir.join("anng"), DistanceMetric::Euclidean, vectors)
        .expect("failed to write index");
    let mut names = String::new();
    for label in labels {
        names.push_str(label.as_ref());
        names.push('\n');
    }
    std::fs::write(dir.join("names.txt"), names).expect("failed to write labels");
}

/// Three 2-d vectors labeled alice, bob, carol.
pub fn three_point_vectors() -> Vec<Vec<f32>> {
    vec![vec![0.0, 0.0], vec![1.0, 2.0], vec![5.0, 5.0]]
}

pub fn write_three_point_dataset(dir: &Path) {
    write_dataset(dir, &three_point_vectors(), &THREE_LABELS);
}

/// Write `metadata.json` at the dataset root.
pub fn write_metadata(dir: &Path, metadata: serde_json::Value) {
    std::fs::write(
        dir.join("metadata.json"),
        serde_json::to_vec(&metadata).expect("failed to encode metadata"),
    )
    .expect("failed to write metadata");
}

/// Local directory source that counts fetches and can be slowed down.
pub struct CountingSource {
    path: PathBuf,
    delay: Duration,
    pub fetches: Arc<AtomicUsize>,
}

impl CountingSource {
    pub fn new(path: impl Into<PathBuf>, delay: Duration) -> Self {
        Self {
            path: path.into(),
            delay,
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArtifactSource for CountingSource {
    async fn fetch(&self) -> Result<DatasetDir> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(DatasetDir::Local(self.path.clone()))
    }

    fn describe(&self) -> String {
        format!("counting {}", self.path.display())
    }
}

/// Source whose fetch always fails.
#[derive(Default)]
pub struct FailingSource {
    pub fetches: Arc<AtomicUsize>,
}

#[async_trait]
impl ArtifactSource for FailingSource {
    async fn fetch(&self) -> Result<DatasetDir> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Err(HwrError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "bucket unreachable",
        )))
    }

    fn describe(&self) -> String {
        "failing".to_string()
    }
}

/// Index stub that records how often it is searched and returns fixed hits.
pub struct StubIndex {
    pub hits: Vec<Neighbor>,
    pub count: usize,
    pub dimension: usize,
    pub searches: Arc<AtomicUsize>,
}

impl StubIndex {
    pub fn new(hits: Vec<Neighbor>, count: usize, dimension: usize) -> Self {
        Self {
            hits,
            count,
            dimension,
            searches: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl VectorIndex for StubIndex {
    fn search(&self, _query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        Ok(self.hits.iter().take(k).copied().collect())
    }

    fn vector_count(&self) -> usize {
        self.count
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn metric(&self) -> DistanceMetric {
        DistanceMetric::Euclidean
    }
}
