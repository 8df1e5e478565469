use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use event_bus::{propagation, EventBus, MessageHeaders, TraceContext};
use person_contracts::{Person, PersonEnvelope, ProcessInfo};
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub bus: Arc<dyn EventBus>,
    pub subject: String,
    pub process: Arc<ProcessInfo>,
}

pub fn persons_router(state: AppState) -> Router {
    Router::new()
        .route("/api/persons", post(register_person))
        .with_state(state)
}

/// POST /api/persons - wrap the record in an envelope and publish it
///
/// The correlation id is assigned here, before publish, and returned to
/// the caller; the worker records the same id in its provenance row.
async fn register_person(
    State(state): State<AppState>,
    Json(person): Json<Person>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let envelope = PersonEnvelope::new(person, &state.process);
    let correlation_id = envelope.correlation_id.clone().unwrap_or_default();

    tracing::info!(
        person_name = %envelope.person.name,
        correlation_id = %correlation_id,
        "Registering person"
    );

    let payload = envelope.to_bytes().map_err(|e| {
        tracing::error!(error = %e, "Failed to encode person envelope");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "encode_failed",
                "message": "Failed to encode person envelope"
            })),
        )
    })?;

    // Start a fresh trace for this registration and carry it on the message
    let ctx = TraceContext::new_root();
    let mut headers = MessageHeaders::new();
    propagation::inject(&ctx, &mut headers);

    state
        .bus
        .publish_with_headers(&state.subject, payload, headers)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to publish person envelope");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "error": "publish_failed",
                    "message": "Failed to publish person envelope"
                })),
            )
        })?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "correlationId": correlation_id })),
    ))
}
