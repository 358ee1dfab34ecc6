//! Object-store construction for the remote dataset archive.
//!
//! Credentials and endpoints come from the provider's standard environment
//! variables (`GOOGLE_APPLICATION_CREDENTIALS`, `AWS_*`, `AZURE_*`).

use std::str::FromStr;
use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::ObjectStore;
use serde::Deserialize;

use crate::error::{HwrError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Gcs,
    S3,
    Azure,
    /// The bucket name is a directory on the local filesystem.
    Local,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::Gcs => write!(f, "gcs"),
            StorageBackend::S3 => write!(f, "s3"),
            StorageBackend::Azure => write!(f, "azure"),
            StorageBackend::Local => write!(f, "local"),
        }
    }
}

impl FromStr for StorageBackend {
    type Err = HwrError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gcs" | "gcp" => Ok(StorageBackend::Gcs),
            "s3" | "aws" => Ok(StorageBackend::S3),
            "azure" => Ok(StorageBackend::Azure),
            "local" | "file" => Ok(StorageBackend::Local),
            other => Err(HwrError::Config(format!(
                "unknown storage backend: {other}"
            ))),
        }
    }
}

/// Build an object store rooted at `bucket` for the given backend.
pub fn build_object_store(backend: StorageBackend, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
    let store: Arc<dyn ObjectStore> = match backend {
        StorageBackend::Gcs => Arc::new(
            GoogleCloudStorageBuilder::from_env()
                .with_bucket_name(bucket)
                .build()?,
        ),
        StorageBackend::S3 => Arc::new(
            AmazonS3Builder::from_env()
                .with_bucket_name(bucket)
                .build()?,
        ),
        StorageBackend::Azure => Arc::new(
            MicrosoftAzureBuilder::from_env()
                .with_container_name(bucket)
                .build()?,
        ),
        StorageBackend::Local => Arc::new(LocalFileSystem::new_with_prefix(bucket)?),
    };
    Ok(store)
}
