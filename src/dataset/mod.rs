//! The process-wide read-only dataset: an opened index plus its labels.

pub mod labels;
pub mod loader;
pub mod metadata;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tempfile::TempDir;
use tracing::{info, instrument, warn};

use crate::config::DatasetConfig;
use crate::error::{HwrError, Result};
use crate::index::{FlatIndex, VectorIndex};

pub use labels::LabelList;
pub use loader::DatasetLoader;
pub use metadata::DatasetMetadata;

/// Directory a dataset was read from.
#[derive(Debug)]
pub enum DatasetDir {
    /// Caller-owned directory; never removed by this crate.
    Local(PathBuf),
    /// Extraction target owned by the dataset; removed on close.
    Temp(TempDir),
}

impl DatasetDir {
    pub fn path(&self) -> &Path {
        match self {
            DatasetDir::Local(path) => path,
            DatasetDir::Temp(dir) => dir.path(),
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, DatasetDir::Temp(_))
    }

    /// Release the directory. Temporary directories are deleted.
    pub fn close(self) -> Result<()> {
        match self {
            DatasetDir::Local(_) => Ok(()),
            DatasetDir::Temp(dir) => {
                let path = dir.path().to_path_buf();
                dir.close()?;
                info!(path = %path.display(), "temporary dataset directory removed");
                Ok(())
            }
        }
    }
}

/// Relative locations of the index and labels inside a dataset directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    pub index_subpath: PathBuf,
    pub labels_file: PathBuf,
    pub metadata_file: PathBuf,
}

impl Default for DatasetLayout {
    fn default() -> Self {
        Self::from_config(&DatasetConfig::default())
    }
}

impl DatasetLayout {
    pub fn from_config(config: &DatasetConfig) -> Self {
        Self {
            index_subpath: PathBuf::from(&config.index_subpath),
            labels_file: PathBuf::from(&config.labels_file),
            metadata_file: PathBuf::from(&config.metadata_file),
        }
    }
}

pub struct Dataset {
    index: Box<dyn VectorIndex>,
    labels: LabelList,
    metadata: DatasetMetadata,
    dir: Option<DatasetDir>,
    loaded_at: DateTime<Utc>,
}

impl std::fmt::Debug for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("vectors", &self.index.vector_count())
            .field("dimension", &self.index.dimension())
            .field("labels", &self.labels.len())
            .field("version", &self.metadata.version())
            .field("dir", &self.dir)
            .field("loaded_at", &self.loaded_at)
            .finish()
    }
}

impl Dataset {
    /// Pair an index with its labels. The label count must equal the
    /// index's vector count.
    pub fn new(index: Box<dyn VectorIndex>, labels: LabelList) -> Result<Self> {
        if index.vector_count() != labels.len() {
            return Err(HwrError::Consistency(format!(
                "index holds {} vectors but {} labels were loaded",
                index.vector_count(),
                labels.len()
            )));
        }
        Ok(Self {
            index,
            labels,
            metadata: DatasetMetadata::default(),
            dir: None,
            loaded_at: Utc::now(),
        })
    }

    /// Open the index read-only and read the labels (and metadata, if any)
    /// from `dir`. The directory is kept alive for as long as the dataset is.
    #[instrument(skip(dir, layout), fields(dir = %dir.path().display()))]
    pub fn open(dir: DatasetDir, layout: &DatasetLayout) -> Result<Self> {
        let index = FlatIndex::open(&dir.path().join(&layout.index_subpath))?;
        info!(vectors = index.vector_count(), "index loaded");

        let labels = LabelList::read(&dir.path().join(&layout.labels_file))?;
        info!(labels = labels.len(), "labels loaded");

        let metadata = DatasetMetadata::read_optional(&dir.path().join(&layout.metadata_file))?;

        let mut dataset = Self::new(Box::new(index), labels)?.with_metadata(metadata)?;
        dataset.dir = Some(dir);
        Ok(dataset)
    }

    /// Attach build metadata, checking it against the index.
    pub fn with_metadata(mut self, metadata: DatasetMetadata) -> Result<Self> {
        metadata.check(self.index.as_ref())?;
        self.metadata = metadata;
        Ok(self)
    }

    pub fn index(&self) -> &dyn VectorIndex {
        self.index.as_ref()
    }

    pub fn labels(&self) -> &LabelList {
        &self.labels
    }

    pub fn metadata(&self) -> &DatasetMetadata {
        &self.metadata
    }

    pub fn dir(&self) -> Option<&DatasetDir> {
        self.dir.as_ref()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Drop the index, then release the backing directory.
    pub fn close(self) -> Result<()> {
        let Dataset { index, dir, .. } = self;
        drop(index);
        match dir {
            Some(dir) => dir.close().inspect_err(|e| {
                warn!(error = %e, "failed to remove dataset directory");
            }),
            None => Ok(()),
        }
    }
}
