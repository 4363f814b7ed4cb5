//! Transaction scheduler service
//!
//! Wires the Postgres store, the broker producer and the chain directory into
//! the use cases, then runs the jobs listener next to the health API and the
//! metrics server until a shutdown signal is received.

use anyhow::Result;
use std::sync::Arc;
use tokio::signal;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use tx_scheduler::api::{self, AppState};
use tx_scheduler::broker::{self, Topics};
use tx_scheduler::chain::{StaticChainRegistry, StaticContractRegistry};
use tx_scheduler::config::{LoggingConfig, Settings};
use tx_scheduler::metrics::MetricsServer;
use tx_scheduler::sessions::{JobsListener, SessionManager};
use tx_scheduler::store::{DataStore, PgStore};
use tx_scheduler::usecases::UseCases;
use tx_scheduler::validators::TransactionValidator;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration before logging so the output format can be chosen
    let settings = Settings::load()?;
    init_logging(&settings.logging);

    info!("Starting transaction scheduler v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded configuration for {} chains", settings.chains.len());

    // Database
    let store = PgStore::new(&settings.database).await?;
    info!("Database connection established");
    store.run_migrations().await?;
    let store: Arc<dyn DataStore> = Arc::new(store);

    // Broker
    let producer = broker::connect(&settings.broker)?;
    let topics = Topics::from_config(&settings.broker);

    // Directories
    let chains = Arc::new(StaticChainRegistry::from_config(&settings.chains));
    let contracts = Arc::new(StaticContractRegistry::from_config(&settings.contracts));
    let validator = TransactionValidator::new(chains, contracts);

    let usecases = UseCases::new(store.clone(), producer, topics, validator);

    let shutdown = CancellationToken::new();
    let sessions = Arc::new(SessionManager::new(
        usecases.clone(),
        &settings.listener,
        shutdown.child_token(),
    ));

    // Start API server
    let api_handle = tokio::spawn({
        let state = AppState {
            store: store.clone(),
            sessions: sessions.clone(),
            instance_id: settings.scheduler.instance_id.clone(),
        };
        let config = settings.api.clone();
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = api::run_server(config, state, shutdown).await {
                error!("API server error: {}", e);
            }
        }
    });

    // Start metrics server
    let metrics_handle = if settings.metrics.enabled {
        let server = MetricsServer::new(settings.metrics.port);
        Some(tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Metrics server error: {}", e);
            }
        }))
    } else {
        None
    };

    // Start jobs listener
    let listener_handle = if settings.listener.enabled {
        let listener = JobsListener::new(
            usecases.search_jobs.clone(),
            sessions.clone(),
            Duration::from_secs(settings.listener.refresh_interval_secs),
        );
        let shutdown = shutdown.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = listener.run(shutdown).await {
                error!("Jobs listener error: {}", e);
            }
        }))
    } else {
        warn!("Jobs listener disabled, pending jobs will not be retried");
        None
    };

    info!("Transaction scheduler is running");
    info!("API server: http://{}:{}", settings.api.host, settings.api.port);
    if settings.metrics.enabled {
        info!("Metrics: http://0.0.0.0:{}/metrics", settings.metrics.port);
    }

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutdown signal received, stopping...");

    // Graceful shutdown
    shutdown.cancel();
    sessions.stop();
    if let Some(h) = listener_handle {
        let _ = h.await;
    }
    let _ = api_handle.await;
    if let Some(h) = metrics_handle {
        h.abort();
    }

    info!("Transaction scheduler stopped");
    Ok(())
}

fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,tx_scheduler=debug,sqlx=warn,hyper=warn")
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.json {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(true))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
