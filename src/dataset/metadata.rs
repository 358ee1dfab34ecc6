//! Optional `metadata.json` at the dataset root.
//!
//! Written by the index build alongside the index and labels. When present,
//! it carries the model version clients must match, the dump timestamp the
//! dataset was built from, and the expected item count and dimension.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, instrument};

use crate::error::{HwrError, Result};
use crate::index::VectorIndex;

/// Version assumed for datasets without metadata and for clients that do
/// not send one.
pub const DEFAULT_VERSION: &str = "1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMetadata {
    /// Source dump modification time, milliseconds since the epoch.
    #[serde(default)]
    pub dump_time: Option<f64>,
    #[serde(default)]
    pub num_items: Option<usize>,
    #[serde(
        rename = "v",
        default = "default_version",
        deserialize_with = "string_or_number"
    )]
    pub version: String,
    #[serde(default)]
    pub dimen: Option<usize>,
}

impl Default for DatasetMetadata {
    fn default() -> Self {
        Self {
            dump_time: None,
            num_items: None,
            version: default_version(),
            dimen: None,
        }
    }
}

impl DatasetMetadata {
    #[instrument(skip(path), fields(path = %path.display()))]
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let meta: Self = serde_json::from_slice(&bytes)?;
        debug!(version = %meta.version, "metadata loaded");
        Ok(meta)
    }

    /// Read `path` if it exists, otherwise fall back to the defaults.
    pub fn read_optional(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::read(path)
        } else {
            debug!(path = %path.display(), "no metadata file, using defaults");
            Ok(Self::default())
        }
    }

    /// The item count and dimension, when recorded, must match the index.
    pub fn check(&self, index: &dyn VectorIndex) -> Result<()> {
        if let Some(n) = self.num_items.filter(|&n| n != index.vector_count()) {
            return Err(HwrError::Consistency(format!(
                "metadata lists {n} items but index holds {}",
                index.vector_count()
            )));
        }
        if let Some(d) = self.dimen.filter(|&d| d != index.dimension()) {
            return Err(HwrError::Consistency(format!(
                "metadata dimension {d} does not match index dimension {}",
                index.dimension()
            )));
        }
        Ok(())
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}
