use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, instrument};

use crate::error::{HwrError, Result};
use crate::types::InternalId;

/// Labels indexed by internal id: line N of the labels file names vector N.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelList {
    labels: Vec<String>,
}

impl LabelList {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// Read one label per line, stripping trailing whitespace.
    #[instrument(skip(path), fields(path = %path.display()))]
    pub fn read(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut labels = Vec::new();
        for line in reader.lines() {
            labels.push(line?.trim_end().to_string());
        }
        debug!(count = labels.len(), "labels loaded");
        Ok(Self { labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, id: InternalId) -> Option<&str> {
        self.labels.get(id).map(String::as_str)
    }

    /// Look up the label for an id the index returned. A miss means the index
    /// and label file disagree, which is never a per-request problem.
    pub fn resolve(&self, id: InternalId) -> Result<&str> {
        self.get(id).ok_or_else(|| {
            HwrError::Consistency(format!(
                "internal id {id} out of range for {} labels",
                self.labels.len()
            ))
        })
    }
}

impl<S: Into<String>> FromIterator<S> for LabelList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().map(Into::into).collect(),
        }
    }
}
