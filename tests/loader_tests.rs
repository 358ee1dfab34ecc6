mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use common::archives::{dataset_tar, gzip, tar_bytes, Member};
use common::fixtures::{write_three_point_dataset, CountingSource, FailingSource};
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;

use hwr_search::config::DatasetConfig;
use hwr_search::dataset::{DatasetLayout, DatasetLoader};
use hwr_search::error::HwrError;
use hwr_search::fetch::{
    source_from_config, ArtifactSource, LocalArchiveSource, LocalDirSource, ObjectStoreSource,
};
use hwr_search::types::DatasetState;

const TIMEOUT: Duration = Duration::from_secs(30);

fn loader_for(source: Arc<dyn ArtifactSource>) -> DatasetLoader {
    DatasetLoader::new(source, DatasetLayout::default(), TIMEOUT)
}

async fn in_memory_source(archive: Vec<u8>) -> ObjectStoreSource {
    let store = Arc::new(InMemory::new());
    store
        .put(&ObjectPath::from("datasets/hwr.tar.gz"), Bytes::from(archive).into())
        .await
        .unwrap();
    ObjectStoreSource::new(store, "test-bucket", "datasets/hwr.tar.gz").unwrap()
}

// ─── Once-only initialization ───

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_share_one_load() {
    let dir = tempfile::TempDir::new().unwrap();
    write_three_point_dataset(dir.path());

    let source = Arc::new(CountingSource::new(dir.path(), Duration::from_millis(100)));
    let loader = Arc::new(loader_for(source.clone()));
    assert_eq!(loader.state(), DatasetState::Uninitialized);

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let loader = loader.clone();
            tokio::spawn(async move { loader.get().await.unwrap() })
        })
        .collect();

    let mut datasets = Vec::new();
    for handle in handles {
        datasets.push(handle.await.unwrap());
    }

    assert_eq!(source.count(), 1, "fetch must run exactly once");
    let first = &datasets[0];
    assert!(datasets.iter().all(|d| Arc::ptr_eq(d, first)));
    assert_eq!(loader.state(), DatasetState::Ready);

    // Later calls reuse the published dataset.
    let again = loader.get().await.unwrap();
    assert!(Arc::ptr_eq(&again, first));
    assert_eq!(source.count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_state_is_loading_while_fetch_in_flight() {
    let dir = tempfile::TempDir::new().unwrap();
    write_three_point_dataset(dir.path());

    let source = Arc::new(CountingSource::new(dir.path(), Duration::from_millis(300)));
    let loader = Arc::new(loader_for(source.clone()));
    assert!(loader.try_get().is_none());

    let warmup = loader.spawn_warmup();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(loader.state(), DatasetState::Loading);
    assert!(loader.try_get().is_none());

    let dataset = warmup.await.unwrap().unwrap();
    assert_eq!(dataset.labels().len(), 3);
    assert_eq!(loader.state(), DatasetState::Ready);
    assert!(loader.try_get().is_some());
}

#[tokio::test]
async fn test_cancelled_caller_does_not_restart_load() {
    let dir = tempfile::TempDir::new().unwrap();
    write_three_point_dataset(dir.path());

    let source = Arc::new(CountingSource::new(dir.path(), Duration::from_millis(200)));
    let loader = loader_for(source.clone());

    let cancelled = tokio::time::timeout(Duration::from_millis(20), loader.get()).await;
    assert!(cancelled.is_err());

    loader.get().await.unwrap();
    assert_eq!(source.count(), 1);
}

#[tokio::test]
async fn test_aborted_warmup_releases_loader_for_shutdown() {
    let dir = tempfile::TempDir::new().unwrap();
    write_three_point_dataset(dir.path());

    let source = Arc::new(CountingSource::new(dir.path(), Duration::from_secs(10)));
    let loader = Arc::new(loader_for(source.clone()));

    let warmup = loader.spawn_warmup();
    let load = warmup.abort_handle();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(loader.state(), DatasetState::Loading);

    load.abort();
    let err = warmup.await.unwrap_err();
    assert!(err.is_cancelled());

    let loader = Arc::try_unwrap(loader).expect("warmup task still holds the loader");
    loader.shutdown().unwrap();
}

// ─── Failure handling ───

#[tokio::test]
async fn test_failed_load_is_terminal() {
    let source = Arc::new(FailingSource::default());
    let loader = loader_for(source.clone());

    let err = loader.get().await.unwrap_err();
    assert!(matches!(err, HwrError::DatasetLoadFailed(_)));
    assert_eq!(err.status_code(), 503);
    assert_eq!(loader.state(), DatasetState::Failed);

    let err = loader.get().await.unwrap_err();
    assert!(matches!(err, HwrError::DatasetLoadFailed(_)));
    assert_eq!(source.fetches.load(Ordering::SeqCst), 1, "no automatic retry");
}

#[tokio::test]
async fn test_load_timeout() {
    let dir = tempfile::TempDir::new().unwrap();
    write_three_point_dataset(dir.path());

    let source = Arc::new(CountingSource::new(dir.path(), Duration::from_secs(10)));
    let loader = DatasetLoader::new(source, DatasetLayout::default(), Duration::from_millis(50));

    let err = loader.get().await.unwrap_err();
    match err {
        HwrError::DatasetLoadFailed(inner) => {
            assert!(matches!(*inner, HwrError::LoadTimeout { .. }), "got {inner:?}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(loader.state(), DatasetState::Failed);
}

#[tokio::test]
async fn test_missing_labels_file_fails_load() {
    let dir = tempfile::TempDir::new().unwrap();
    write_three_point_dataset(dir.path());
    std::fs::remove_file(dir.path().join("names.txt")).unwrap();

    let loader = loader_for(Arc::new(LocalDirSource::new(dir.path())));
    let err = loader.get().await.unwrap_err();
    assert!(matches!(err, HwrError::DatasetLoadFailed(_)));
}

// ─── Sources ───

#[tokio::test]
async fn test_remote_archive_load_and_shutdown() {
    let src = tempfile::TempDir::new().unwrap();
    write_three_point_dataset(src.path());
    let source = in_memory_source(gzip(&dataset_tar(src.path()))).await;

    let loader = loader_for(Arc::new(source));
    let dataset = loader.get().await.unwrap();
    assert_eq!(dataset.index().vector_count(), 3);
    assert_eq!(dataset.labels().get(2), Some("carol"));

    let dir = dataset.dir().unwrap();
    assert!(dir.is_temporary());
    let extracted = dir.path().to_path_buf();
    assert!(extracted.join("anng").is_dir());
    drop(dataset);

    loader.shutdown().unwrap();
    assert!(!extracted.exists(), "temporary directory removed at shutdown");
}

#[tokio::test]
async fn test_remote_archive_with_unsafe_member_publishes_nothing() {
    let archive = gzip(&tar_bytes(&[
        Member::File("names.txt", b"a\n"),
        Member::RawFile("../../escape.txt", b"pwned"),
    ]));
    let loader = loader_for(Arc::new(in_memory_source(archive).await));

    let err = loader.get().await.unwrap_err();
    match err {
        HwrError::DatasetLoadFailed(inner) => {
            assert!(
                matches!(*inner, HwrError::UnsafeArchiveMember { .. }),
                "got {inner:?}"
            );
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(loader.try_get().is_none());
}

#[tokio::test]
async fn test_remote_missing_object_is_fetch_error() {
    let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
    let source = ObjectStoreSource::new(store, "test-bucket", "missing.tar.gz").unwrap();

    let err = source.fetch().await.unwrap_err();
    assert!(matches!(err, HwrError::Storage(_)), "got {err:?}");
}

#[tokio::test]
async fn test_local_archive_source() {
    let src = tempfile::TempDir::new().unwrap();
    write_three_point_dataset(src.path());
    let archive_dir = tempfile::TempDir::new().unwrap();
    let archive_path = archive_dir.path().join("hwr.tar");
    std::fs::write(&archive_path, dataset_tar(src.path())).unwrap();

    let loader = loader_for(Arc::new(LocalArchiveSource::new(&archive_path)));
    let dataset = loader.get().await.unwrap();
    assert_eq!(dataset.labels().len(), 3);
    assert_ne!(dataset.dir().unwrap().path(), src.path());
}

#[tokio::test]
async fn test_local_dir_source_rejects_file() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let err = LocalDirSource::new(file.path()).fetch().await.unwrap_err();
    assert!(matches!(err, HwrError::Config(_)));
}

#[tokio::test]
async fn test_source_selection_priority() {
    let config = DatasetConfig {
        local_path: Some("/data/hwr".into()),
        archive_path: Some("/data/hwr.tar.gz".into()),
        ..DatasetConfig::default()
    };
    let source = source_from_config(&config).unwrap();
    assert!(source.describe().starts_with("local directory"));

    let config = DatasetConfig {
        archive_path: Some("/data/hwr.tar.gz".into()),
        ..DatasetConfig::default()
    };
    let source = source_from_config(&config).unwrap();
    assert!(source.describe().starts_with("local archive"));

    let bucket = tempfile::TempDir::new().unwrap();
    let config = DatasetConfig {
        bucket: Some(bucket.path().to_str().unwrap().to_string()),
        object: Some("hwr.tar.gz".into()),
        backend: hwr_search::storage::StorageBackend::Local,
        ..DatasetConfig::default()
    };
    let source = source_from_config(&config).unwrap();
    assert!(source.describe().starts_with("object"));

    let err = source_from_config(&DatasetConfig::default()).err().unwrap();
    assert!(matches!(err, HwrError::NoDatasetSource));
}

#[tokio::test]
async fn test_local_backend_bucket_end_to_end() {
    let src = tempfile::TempDir::new().unwrap();
    write_three_point_dataset(src.path());
    let bucket = tempfile::TempDir::new().unwrap();
    std::fs::write(bucket.path().join("hwr.tar.gz"), gzip(&dataset_tar(src.path()))).unwrap();

    let config = DatasetConfig {
        bucket: Some(bucket.path().to_str().unwrap().to_string()),
        object: Some("hwr.tar.gz".into()),
        backend: hwr_search::storage::StorageBackend::Local,
        ..DatasetConfig::default()
    };
    let loader = DatasetLoader::from_config(&config).unwrap();
    let dataset = loader.get().await.unwrap();
    assert_eq!(dataset.labels().get(0), Some("alice"));
}
