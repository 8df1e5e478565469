mod config;
mod routes;

use axum::{routing::get, Json, Router};
use config::{BusType, Config};
use event_bus::{EventBus, InMemoryBus, NatsBus};
use person_contracts::ProcessInfo;
use routes::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env().expect("Failed to load configuration from environment");
    tracing::info!(subject = %config.subject, "Configuration loaded");

    // Initialize event bus
    let bus: Arc<dyn EventBus> = match config.bus_type {
        BusType::Nats => {
            tracing::info!("Connecting to NATS at {}", config.nats_url);
            let nats_client = async_nats::connect(&config.nats_url)
                .await
                .expect("Failed to connect to NATS");
            Arc::new(NatsBus::new(nats_client))
        }
        BusType::InMemory => {
            tracing::info!("Using in-memory event bus");
            Arc::new(InMemoryBus::new())
        }
    };

    let process = Arc::new(ProcessInfo::capture(
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
    ));

    let state = AppState {
        bus,
        subject: config.subject.clone(),
        process,
    };

    let app = Router::new()
        .route("/api/health", get(health))
        .merge(routes::persons_router(state))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Person API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind");

    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "module": "person-api",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
