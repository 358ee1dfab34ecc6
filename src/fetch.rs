//! Artifact sources: where the dataset directory comes from.
//!
//! A local directory is used in place. Archives (a local file or a blob in a
//! bucket) are extracted into a fresh temporary directory that the returned
//! `DatasetDir` owns.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use tempfile::TempDir;
use tracing::{info, instrument};

use crate::archive::{extract_stream, ExtractSummary};
use crate::config::DatasetConfig;
use crate::dataset::DatasetDir;
use crate::error::{HwrError, Result};
use crate::storage::build_object_store;

const TEMP_DIR_PREFIX: &str = "hwrsearch-";

/// Produces the directory a dataset is opened from.
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    async fn fetch(&self) -> Result<DatasetDir>;

    /// Human-readable location for logs.
    fn describe(&self) -> String;
}

/// Already-extracted dataset directory.
#[derive(Debug, Clone)]
pub struct LocalDirSource {
    path: PathBuf,
}

impl LocalDirSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ArtifactSource for LocalDirSource {
    async fn fetch(&self) -> Result<DatasetDir> {
        let meta = tokio::fs::metadata(&self.path).await?;
        if !meta.is_dir() {
            return Err(HwrError::Config(format!(
                "dataset path is not a directory: {}",
                self.path.display()
            )));
        }
        Ok(DatasetDir::Local(self.path.clone()))
    }

    fn describe(&self) -> String {
        format!("local directory {}", self.path.display())
    }
}

/// Tar or tar.gz archive on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalArchiveSource {
    path: PathBuf,
}

impl LocalArchiveSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ArtifactSource for LocalArchiveSource {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn fetch(&self) -> Result<DatasetDir> {
        let path = self.path.clone();
        let dir = run_blocking(move || {
            let dir = new_temp_dir()?;
            let reader = BufReader::new(File::open(&path)?);
            let summary = extract_stream(reader, dir.path())?;
            log_extracted(&dir, &summary);
            Ok(dir)
        })
        .await?;
        Ok(DatasetDir::Temp(dir))
    }

    fn describe(&self) -> String {
        format!("local archive {}", self.path.display())
    }
}

/// Archive blob in an object store bucket.
pub struct ObjectStoreSource {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    location: ObjectPath,
}

impl ObjectStoreSource {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>, object: &str) -> Result<Self> {
        Ok(Self {
            store,
            bucket: bucket.into(),
            location: ObjectPath::parse(object)?,
        })
    }

    /// Download the whole blob into memory.
    async fn download(&self) -> Result<Bytes> {
        let start = std::time::Instant::now();
        let data = self.store.get(&self.location).await?.bytes().await?;
        info!(
            bytes = data.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "dataset download complete"
        );
        Ok(data)
    }
}

#[async_trait]
impl ArtifactSource for ObjectStoreSource {
    #[instrument(skip(self), fields(bucket = %self.bucket, object = %self.location))]
    async fn fetch(&self) -> Result<DatasetDir> {
        info!("dataset download start");
        let data = self.download().await?;

        let dir = run_blocking(move || {
            let dir = new_temp_dir()?;
            let summary = extract_stream(&data[..], dir.path())?;
            log_extracted(&dir, &summary);
            Ok(dir)
        })
        .await?;
        Ok(DatasetDir::Temp(dir))
    }

    fn describe(&self) -> String {
        format!("object {}/{}", self.bucket, self.location)
    }
}

/// Pick the source the configuration selects: local directory, then local
/// archive, then bucket + object.
pub fn source_from_config(config: &DatasetConfig) -> Result<Arc<dyn ArtifactSource>> {
    if let Some(path) = &config.local_path {
        return Ok(Arc::new(LocalDirSource::new(path)));
    }
    if let Some(path) = &config.archive_path {
        return Ok(Arc::new(LocalArchiveSource::new(path)));
    }
    match (&config.bucket, &config.object) {
        (Some(bucket), Some(object)) => {
            let store = build_object_store(config.backend, bucket)?;
            Ok(Arc::new(ObjectStoreSource::new(store, bucket, object)?))
        }
        _ => Err(HwrError::NoDatasetSource),
    }
}

fn new_temp_dir() -> Result<TempDir> {
    Ok(tempfile::Builder::new().prefix(TEMP_DIR_PREFIX).tempdir()?)
}

fn log_extracted(dir: &TempDir, summary: &ExtractSummary) {
    info!(
        path = %dir.path().display(),
        files = summary.files,
        bytes = summary.bytes,
        "dataset extract complete"
    );
}

/// Run filesystem-heavy work off the async runtime.
async fn run_blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| HwrError::Internal(format!("blocking task failed: {e}")))?
}
