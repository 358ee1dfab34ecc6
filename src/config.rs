use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{HwrError, Result};
use crate::storage::StorageBackend;

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub dataset: DatasetConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Request timeout for the search endpoint, in seconds.
    pub request_timeout_secs: u64,
    /// Maximum accepted request body, in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Where the dataset comes from and how it is laid out on disk.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Already-extracted dataset directory. Takes priority over everything else.
    pub local_path: Option<PathBuf>,
    /// Local tar or tar.gz archive, extracted into a temporary directory.
    pub archive_path: Option<PathBuf>,
    /// Remote bucket holding the archive. Requires `object`.
    pub bucket: Option<String>,
    /// Object name of the archive inside `bucket`. Requires `bucket`.
    pub object: Option<String>,
    pub backend: StorageBackend,
    /// Index directory relative to the dataset root.
    pub index_subpath: String,
    /// Labels file relative to the dataset root.
    pub labels_file: String,
    /// Optional metadata file (version, dump time) relative to the dataset root.
    pub metadata_file: String,
    pub load_timeout_secs: u64,
    /// Start loading in the background as soon as the process starts.
    pub warmup_on_start: bool,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            local_path: None,
            archive_path: None,
            bucket: None,
            object: None,
            backend: StorageBackend::default(),
            index_subpath: "anng".to_string(),
            labels_file: "names.txt".to_string(),
            metadata_file: "metadata.json".to_string(),
            load_timeout_secs: 300,
            warmup_on_start: true,
        }
    }
}

impl DatasetConfig {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `json` or `text`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file (explicit path, then `$HWR_CONFIG`),
    /// apply environment overrides and validate.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let path = path
            .map(str::to_string)
            .or_else(|| std::env::var("HWR_CONFIG").ok());

        let mut config = match path {
            Some(p) => Self::from_file(Path::new(&p))?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| HwrError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| HwrError::Config(e.to_string()))
    }

    /// Apply overrides from an environment-like lookup. Empty values are
    /// treated as unset; a value that does not parse is a config error.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("HWR_INDEX_PATH") {
            self.dataset.local_path = Some(PathBuf::from(v));
        }
        if let Some(v) = get("HWR_INDEX_TARGZ_PATH") {
            self.dataset.archive_path = Some(PathBuf::from(v));
        }
        if let Some(v) = get("INDEX_BUCKET_NAME") {
            self.dataset.bucket = Some(v);
        }
        if let Some(v) = get("INDEX_BLOB_NAME") {
            self.dataset.object = Some(v);
        }
        if let Some(v) = get("INDEX_STORAGE_BACKEND") {
            self.dataset.backend = parse_env("INDEX_STORAGE_BACKEND", &v, |v| v.parse().ok())?;
        }
        if let Some(v) = get("HWR_LOAD_TIMEOUT_SECS") {
            self.dataset.load_timeout_secs =
                parse_env("HWR_LOAD_TIMEOUT_SECS", &v, |v| v.trim().parse().ok())?;
        }
        if let Some(v) = get("HWR_WARMUP_ON_START") {
            self.dataset.warmup_on_start = parse_env("HWR_WARMUP_ON_START", &v, parse_bool)?;
        }
        if let Some(v) = get("HWR_HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("PORT") {
            self.server.port = parse_env("PORT", &v, |v| v.trim().parse().ok())?;
        }
        if let Some(v) = get("HWR_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = get("HWR_LOG_FORMAT") {
            self.logging.format = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let ds = &self.dataset;
        match (&ds.bucket, &ds.object) {
            (Some(_), None) => {
                return Err(HwrError::Config(
                    "bucket is set but object is missing".into(),
                ))
            }
            (None, Some(_)) => {
                return Err(HwrError::Config(
                    "object is set but bucket is missing".into(),
                ))
            }
            _ => {}
        }
        if ds.load_timeout_secs == 0 {
            return Err(HwrError::Config("load_timeout_secs must be > 0".into()));
        }
        validate_relative("index_subpath", &ds.index_subpath)?;
        validate_relative("labels_file", &ds.labels_file)?;
        validate_relative("metadata_file", &ds.metadata_file)?;
        Ok(())
    }
}

fn validate_relative(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(HwrError::Config(format!("{name} must not be empty")));
    }
    let escapes = Path::new(value)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(HwrError::Config(format!(
            "{name} must be a relative path inside the dataset: {value}"
        )));
    }
    Ok(())
}

fn parse_env<T>(key: &str, value: &str, parse: impl FnOnce(&str) -> Option<T>) -> Result<T> {
    parse(value).ok_or_else(|| HwrError::Config(format!("invalid value for {key}: {value:?}")))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
