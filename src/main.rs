//! docwatch - Document Database Telemetry Service
//!
//! This is the composition root that wires together all the components.

use docwatch::adapters::inbound::{ApiServer, ApiState};
use docwatch::adapters::outbound::{JsonConnectionFile, MongoClientFactory, SqliteMetricsStore};
use docwatch::application::{ConnectionRegistry, TelemetryService};
use docwatch::config::load_config;
use docwatch::domain::ports::{ConnectionConfigRepository, MetricsStore};
use docwatch::infrastructure::{shutdown_signal, MetricsCollector, ShutdownController};
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let cfg = load_config()?;

    // Setup logging
    let log_level = if cfg.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    tracing::info!(
        "starting docwatch listen={} store={}",
        cfg.listen_addr,
        cfg.store_path
    );

    // ===== COMPOSITION ROOT =====

    // 1. Outbound adapters
    let store: Arc<dyn MetricsStore> = Arc::new(SqliteMetricsStore::open(&cfg.store_path)?);
    let connections_file: Arc<dyn ConnectionConfigRepository> =
        Arc::new(JsonConnectionFile::new(&cfg.connections_path));

    // 2. Application services
    let registry = Arc::new(ConnectionRegistry::new(Arc::new(MongoClientFactory::new())));
    let telemetry = Arc::new(TelemetryService::new(store.clone(), cfg.display_limit));

    // 3. Restore persisted connections
    match connections_file.load().await {
        Ok(configs) => {
            for c in configs {
                if let Err(e) = registry
                    .add(&c.name, &c.connection_string, c.connection_options)
                    .await
                {
                    tracing::warn!("skipping persisted connection '{}': {}", c.name, e);
                }
            }
            tracing::info!("restored {} connections", registry.len());
        }
        Err(e) => tracing::error!("failed to load connections file: {}", e),
    }

    // 4. Background collector
    let collector = MetricsCollector::new(cfg.monitoring(), registry.clone(), store.clone());
    collector.start();

    // 5. Inbound adapter, served until a shutdown signal
    let shutdown = ShutdownController::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    let server = ApiServer::new(
        cfg.listen_addr.clone(),
        ApiState::new(
            registry.clone(),
            telemetry,
            connections_file,
            cfg.window_hours,
        ),
    );
    let served = server.run(shutdown.clone()).await;
    // a bind failure returns before any signal
    shutdown.shutdown();

    // 6. Teardown
    collector.stop().await;
    registry.close_all().await;
    if let Err(e) = store.close().await {
        tracing::error!("failed to close metrics store: {}", e);
    }
    tracing::info!("docwatch stopped");

    served
}
