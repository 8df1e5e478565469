use event_bus::{EventBus, InMemoryBus, NatsBus};
use person_contracts::ProcessInfo;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use person_worker::config::{AckMode, BusType, Config};
use person_worker::heartbeat::run_heartbeat;
use person_worker::{run_consumer, PgPersonStore};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file (if present)
    dotenvy::dotenv().ok();

    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    tracing::info!("Starting person worker...");

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration from environment");

    if config.ack_mode == AckMode::AtLeastOnce {
        tracing::error!(
            "ACK_MODE=at-least-once is not supported on a core NATS subscription \
             (it needs a JetStream consumer with manual acks); only at-most-once is available"
        );
        std::process::exit(1);
    }

    tracing::info!(
        subject = %config.subject,
        ack_mode = %config.ack_mode,
        heartbeat_secs = config.heartbeat_interval.as_secs(),
        "Configuration loaded"
    );

    // Database connection
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // Create event bus
    let bus: Arc<dyn EventBus> = match config.bus_type {
        BusType::Nats => {
            tracing::info!("Connecting to NATS at {}", config.nats_url);
            let client = async_nats::connect(&config.nats_url)
                .await
                .expect("Failed to connect to NATS");
            Arc::new(NatsBus::new(client))
        }
        BusType::InMemory => {
            tracing::info!("Using InMemory event bus");
            Arc::new(InMemoryBus::new())
        }
    };

    // Provenance is captured once here and passed down; no process-wide statics
    let process = ProcessInfo::capture(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    let store = Arc::new(PgPersonStore::new(pool.clone(), process.host.clone()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let heartbeat = tokio::spawn(run_heartbeat(config.heartbeat_interval, shutdown_rx.clone()));
    let mut consumer = tokio::spawn(run_consumer(
        bus,
        store,
        config.subject.clone(),
        shutdown_rx,
    ));

    let mut transport_failed = false;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received, draining...");
            let _ = shutdown_tx.send(true);
            match consumer.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "Consumer failed during shutdown"),
                Err(e) => tracing::error!(error = %e, "Consumer task panicked"),
            }
        }
        result = &mut consumer => {
            // The consumer never exits on its own in normal operation;
            // this is a transport failure or a closed subscription.
            let _ = shutdown_tx.send(true);
            transport_failed = true;
            match result {
                Ok(Ok(())) => tracing::warn!("Consumer exited unexpectedly"),
                Ok(Err(e)) => tracing::error!(error = %e, "Consumer failed"),
                Err(e) => tracing::error!(error = %e, "Consumer task panicked"),
            }
        }
    }

    if let Err(e) = heartbeat.await {
        tracing::error!(error = %e, "Heartbeat task panicked");
    }

    if transport_failed {
        std::process::exit(1);
    }

    tracing::info!("Person worker stopped");
}
