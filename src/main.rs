//! Warehouse server binary
//!
//! Runs the HTTP API over in-memory stores and an in-memory broker, with one
//! event receiver per published entity kind writing the audit log.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use serde_json::Value;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use warehouse::messaging::{
    spawn_receiver, BrokerConnection, BrokerPublisher, EntityEvent, EventLogHandler,
    EventPublisher, InMemoryBroker, MessageReceiver, RedeliveryPolicy,
};
use warehouse::models::{Customer, Entity, Manufacturer, Product, User};
use warehouse::store::RetryPolicy;
use warehouse::{create_router, spawn_cleanup_task, AppState, Config, Stores};

/// Queues the audit log receivers listen on.
const EVENT_QUEUES: [&str; 4] = [Customer::KIND, Manufacturer::KIND, Product::KIND, User::KIND];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warehouse=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting warehouse server");

    let config = Config::from_env();
    info!(
        port = config.server_port,
        data_dir = %config.data_dir.display(),
        retry_count = config.retry.retry_count,
        max_deliveries = config.max_deliveries,
        "Configuration loaded"
    );
    if config.uses_dev_secret() {
        warn!("JWT_SECRET is not set, signing tokens with the development secret");
    }

    let broker = InMemoryBroker::new();
    let publisher_connection = broker.connect();
    let publisher: Arc<dyn EventPublisher> = Arc::new(
        BrokerPublisher::open(&publisher_connection)
            .await
            .context("failed to open publisher channel")?,
    );

    let stores = Stores::in_memory(RetryPolicy::from(config.retry));
    let state = AppState::from_config(&config, stores, Some(publisher));
    let shutdown = CancellationToken::new();

    let cleanup_handle = spawn_cleanup_task(
        state.services.cache.store(),
        config.cleanup_interval,
        shutdown.clone(),
    );

    let policy = RedeliveryPolicy {
        max_deliveries: config.max_deliveries,
    };
    let receivers: Vec<_> = EVENT_QUEUES
        .iter()
        .map(|queue| {
            let receiver = MessageReceiver::<EntityEvent<Value>, _>::new(
                Box::new(broker.connect()),
                *queue,
                EventLogHandler::new(state.services.logs.clone()),
                policy,
            );
            spawn_receiver(receiver, shutdown.clone())
        })
        .collect();
    info!(count = receivers.len(), "Event receivers started");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .context("server error")?;

    // The signal handler cancelled the token; wait for background work
    for handle in receivers {
        match handle.await {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => warn!(error = %err, "Receiver ended with an error"),
            Err(err) => warn!(error = %err, "Receiver task panicked"),
        }
    }
    if let Err(err) = cleanup_handle.await {
        warn!(error = %err, "Cache sweep task panicked");
    }
    if let Err(err) = publisher_connection.close().await {
        warn!(error = %err, "Failed to close publisher connection");
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for Ctrl+C or SIGTERM, then cancels `shutdown`.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    shutdown.cancel();
}
