//! One-time, concurrency-safe dataset initialization.
//!
//! The first `get()` starts a single load task (fetch, extract, open index,
//! read labels). Concurrent callers share the same pending future; once it
//! resolves, the outcome is published in a `OnceLock` and later calls read it
//! without taking any lock. A failed load is cached and never retried.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

use crate::config::DatasetConfig;
use crate::error::{HwrError, Result};
use crate::fetch::{source_from_config, ArtifactSource};
use crate::types::DatasetState;

use super::{Dataset, DatasetLayout};

type LoadOutcome = std::result::Result<Arc<Dataset>, Arc<HwrError>>;
type PendingLoad = Shared<BoxFuture<'static, LoadOutcome>>;

pub struct DatasetLoader {
    source: Arc<dyn ArtifactSource>,
    layout: DatasetLayout,
    load_timeout: Duration,
    pending: Mutex<Option<PendingLoad>>,
    outcome: OnceLock<LoadOutcome>,
}

impl DatasetLoader {
    pub fn new(
        source: Arc<dyn ArtifactSource>,
        layout: DatasetLayout,
        load_timeout: Duration,
    ) -> Self {
        Self {
            source,
            layout,
            load_timeout,
            pending: Mutex::new(None),
            outcome: OnceLock::new(),
        }
    }

    pub fn from_config(config: &DatasetConfig) -> Result<Self> {
        Ok(Self::new(
            source_from_config(config)?,
            DatasetLayout::from_config(config),
            config.load_timeout(),
        ))
    }

    /// A loader that is already `Ready` with the given dataset.
    pub fn ready(dataset: Dataset) -> Self {
        let loader = Self::new(
            Arc::new(NoSource),
            DatasetLayout::default(),
            Duration::from_secs(1),
        );
        let _ = loader.outcome.set(Ok(Arc::new(dataset)));
        loader
    }

    /// Return the dataset, loading it on first use. Callers arriving while
    /// the load is in flight wait for it; nobody sees a partial dataset.
    pub async fn get(&self) -> Result<Arc<Dataset>> {
        if let Some(outcome) = self.outcome.get() {
            return unpack(outcome);
        }

        let pending = {
            let mut slot = self.lock_pending();
            // Re-check under the lock: the slot is cleared only after the
            // outcome is published.
            if let Some(outcome) = self.outcome.get() {
                return unpack(outcome);
            }
            slot.get_or_insert_with(|| self.start_load()).clone()
        };

        let outcome = pending.await;
        let published = self.outcome.get_or_init(|| outcome);
        self.lock_pending().take();
        unpack(published)
    }

    /// The dataset if it is already loaded. Never waits.
    pub fn try_get(&self) -> Option<Arc<Dataset>> {
        match self.outcome.get() {
            Some(Ok(dataset)) => Some(dataset.clone()),
            _ => None,
        }
    }

    pub fn state(&self) -> DatasetState {
        match self.outcome.get() {
            Some(Ok(_)) => DatasetState::Ready,
            Some(Err(_)) => DatasetState::Failed,
            None if self.lock_pending().is_some() => DatasetState::Loading,
            None => DatasetState::Uninitialized,
        }
    }

    /// Start loading in the background and hand back a handle the startup
    /// sequence can await.
    pub fn spawn_warmup(self: &Arc<Self>) -> JoinHandle<Result<Arc<Dataset>>> {
        let loader = Arc::clone(self);
        tokio::spawn(async move { loader.get().await })
    }

    /// Close the dataset exactly once. If request handlers still hold a
    /// reference, the dataset is released when the last of them drops it.
    pub fn shutdown(self) -> Result<()> {
        let Some(Ok(dataset)) = self.outcome.into_inner() else {
            return Ok(());
        };
        match Arc::try_unwrap(dataset) {
            Ok(dataset) => {
                info!("closing dataset");
                dataset.close()
            }
            Err(shared) => {
                info!(
                    references = Arc::strong_count(&shared),
                    "dataset still referenced at shutdown, deferring close"
                );
                Ok(())
            }
        }
    }

    fn lock_pending(&self) -> MutexGuard<'_, Option<PendingLoad>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Spawn the load on its own task so that a cancelled caller cannot
    /// abandon it half way.
    fn start_load(&self) -> PendingLoad {
        let source = Arc::clone(&self.source);
        let layout = self.layout.clone();
        let timeout = self.load_timeout;

        let task = tokio::spawn(async move {
            let start = Instant::now();
            let result = match tokio::time::timeout(timeout, load(source, layout)).await {
                Ok(result) => result,
                Err(_) => Err(HwrError::LoadTimeout {
                    seconds: timeout.as_secs(),
                }),
            };
            let elapsed = start.elapsed();
            crate::metrics::DATASET_LOAD_DURATION.observe(elapsed.as_secs_f64());

            match result {
                Ok(dataset) => {
                    crate::metrics::DATASET_LOADS_TOTAL
                        .with_label_values(&["ok"])
                        .inc();
                    info!(elapsed_ms = elapsed.as_millis(), "dataset load finished");
                    Ok(Arc::new(dataset))
                }
                Err(e) => {
                    crate::metrics::DATASET_LOADS_TOTAL
                        .with_label_values(&["error"])
                        .inc();
                    error!(error = %e, elapsed_ms = elapsed.as_millis(), "dataset load failed");
                    Err(Arc::new(e))
                }
            }
        });

        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => Err(Arc::new(HwrError::Internal(format!(
                    "dataset load task failed: {e}"
                )))),
            }
        }
        .boxed()
        .shared()
    }
}

#[instrument(skip_all, fields(source = %source.describe()))]
async fn load(source: Arc<dyn ArtifactSource>, layout: DatasetLayout) -> Result<Dataset> {
    info!("dataset load started");
    let dir = source.fetch().await?;
    tokio::task::spawn_blocking(move || Dataset::open(dir, &layout))
        .await
        .map_err(|e| HwrError::Internal(format!("dataset open task failed: {e}")))?
}

fn unpack(outcome: &LoadOutcome) -> Result<Arc<Dataset>> {
    match outcome {
        Ok(dataset) => Ok(Arc::clone(dataset)),
        Err(e) => Err(HwrError::DatasetLoadFailed(Arc::clone(e))),
    }
}

/// Source for loaders built around an already-open dataset.
struct NoSource;

#[async_trait::async_trait]
impl ArtifactSource for NoSource {
    async fn fetch(&self) -> Result<super::DatasetDir> {
        Err(HwrError::NoDatasetSource)
    }

    fn describe(&self) -> String {
        "none".to_string()
    }
}

impl std::fmt::Debug for DatasetLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetLoader")
            .field("source", &self.source.describe())
            .field("layout", &self.layout)
            .field("state", &self.state())
            .finish()
    }
}
