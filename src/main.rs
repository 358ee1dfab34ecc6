use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use hwr_search::config::Config;
use hwr_search::dataset::DatasetLoader;
use hwr_search::query::QueryProcessor;
use hwr_search::server::routes::build_router;
use hwr_search::server::AppState;

#[tokio::main]
async fn main() {
    // Load .env
    let _ = dotenvy::dotenv();

    // Load config first (needed for logging setup)
    let config = Config::load(None).expect("failed to load config");

    // Initialize tracing from LoggingConfig
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .init();
        }
    }

    hwr_search::metrics::init();
    tracing::info!("hwr-search starting");

    let loader = Arc::new(
        DatasetLoader::from_config(&config.dataset).expect("failed to configure dataset source"),
    );
    tracing::info!(loader = ?loader, "dataset source configured");

    // A failed warmup is fatal: stop serving instead of answering every
    // request with a missing dataset.
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
    let warmup = config.dataset.warmup_on_start.then(|| {
        let handle = loader.spawn_warmup();
        let load = handle.abort_handle();
        let shutdown_tx = shutdown_tx.clone();
        let monitor = tokio::spawn(async move {
            match handle.await {
                Ok(Ok(dataset)) => {
                    tracing::info!(dataset = ?dataset, "dataset ready");
                    true
                }
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "dataset warmup failed, shutting down");
                    let _ = shutdown_tx.send(true);
                    false
                }
                Err(e) if e.is_cancelled() => true,
                Err(e) => {
                    tracing::error!(error = %e, "warmup task panicked, shutting down");
                    let _ = shutdown_tx.send(true);
                    false
                }
            }
        });
        (load, monitor)
    });

    // Build application state
    let state = AppState {
        processor: QueryProcessor::new(loader.clone()),
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = build_router(state);

    // Bind and serve
    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(addr = %addr, "listening");

    let listener = TcpListener::bind(&addr)
        .await
        .expect("failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("interrupt received");
                }
                _ = shutdown_rx.wait_for(|stop| *stop) => {}
            }
        })
        .await
        .expect("server error");

    // Cancel a warmup still in flight; the monitor resolves only once the
    // warmup task, and its loader reference, is dropped.
    let warmed = match warmup {
        Some((load, monitor)) => {
            load.abort();
            monitor.await.unwrap_or(false)
        }
        None => true,
    };

    // Close the dataset (and its temporary directory) exactly once.
    match Arc::try_unwrap(loader) {
        Ok(loader) => {
            if let Err(e) = loader.shutdown() {
                tracing::warn!(error = %e, "dataset shutdown failed");
            }
        }
        Err(_) => tracing::warn!("dataset loader still shared at exit, skipping close"),
    }

    tracing::info!("hwr-search stopped");
    if !warmed {
        std::process::exit(1);
    }
}
