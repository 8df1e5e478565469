//! Person envelope consumer
//!
//! Owns the subscription lifecycle and the per-message pipeline:
//! extract trace context from headers, open the consumption span, decode
//! the envelope, persist it. Failures are contained per message — a bad
//! message is logged, its span is marked as an error, and the
//! subscription keeps going. Only transport setup failures are fatal.

use event_bus::{propagation, BusMessage, EventBus};
use futures::StreamExt;
use person_contracts::PersonEnvelope;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::Instrument;

use crate::store::PersonStore;

/// Process-level worker failures.
///
/// Per-message decode/persist failures never surface here; they are
/// handled inside the message boundary.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// Connect/subscribe failed — fatal to this subscription attempt.
    /// Surfaced loudly so the process does not idle without a subscription.
    #[error("transport error: {0}")]
    Transport(#[from] event_bus::BusError),
}

/// Run the consumer loop until the shutdown signal fires.
///
/// Messages are consumed at delivery time (at-most-once); handling of one
/// message completes before the next is taken, and an in-flight message is
/// allowed to finish when shutdown is requested.
pub async fn run_consumer(
    bus: Arc<dyn EventBus>,
    store: Arc<dyn PersonStore>,
    subject: String,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), WorkerError> {
    tracing::info!(subject = %subject, "Starting person consumer");

    let mut stream = bus.subscribe(&subject).await?;

    tracing::info!(subject = %subject, "Subscribed, waiting for messages");

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                tracing::info!("Shutdown requested, stopping consumer");
                break;
            }
            msg = stream.next() => {
                match msg {
                    // The arm body runs to completion once selected, so an
                    // in-flight message drains before shutdown is observed.
                    Some(msg) => handle_message(store.as_ref(), &msg).await,
                    None => {
                        tracing::warn!(subject = %subject, "Subscription stream ended");
                        break;
                    }
                }
            }
        }
    }

    tracing::info!(subject = %subject, "Person consumer stopped");
    Ok(())
}

/// Process one message: extract → decode → persist, inside the
/// consumption span. Never returns an error past the message boundary.
async fn handle_message(store: &dyn PersonStore, msg: &BusMessage) {
    // Header extraction never aborts processing; malformed headers
    // degrade to an empty context.
    let ctx = propagation::extract(msg.headers.as_ref());
    let body = String::from_utf8_lossy(&msg.payload).into_owned();

    // Messaging semantic convention: span is named "<routing key> receive"
    let span = tracing::info_span!(
        "receive",
        otel.name = %format!("{} receive", msg.subject),
        otel.kind = "consumer",
        otel.status_code = tracing::field::Empty,
        message = %body,
        messaging.system = "nats",
        messaging.destination_kind = "queue",
        messaging.destination = %msg.subject,
        messaging.routing_key = %msg.subject,
        trace.parent_trace_id = ctx
            .parent
            .as_ref()
            .map(|p| p.trace_id.as_str())
            .unwrap_or(""),
        trace.parent_span_id = ctx
            .parent
            .as_ref()
            .map(|p| p.span_id.as_str())
            .unwrap_or(""),
        trace.baggage = %ctx.baggage_string(),
    );

    async {
        tracing::info!(subject = %msg.subject, "New message");

        let envelope = match PersonEnvelope::from_bytes(&msg.payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::error!(error = %e, "Deserialization failed, dropping message");
                tracing::Span::current().record("otel.status_code", "ERROR");
                return;
            }
        };

        match store.save(&envelope, &msg.subject).await {
            Ok(person_id) => {
                tracing::info!(
                    person_id = %person_id,
                    correlation_id = %envelope.correlation_id.as_deref().unwrap_or("none"),
                    "Envelope persisted"
                );
            }
            Err(e) => {
                // Under at-most-once the message was already consumed at
                // delivery time; a persistence failure means it is gone.
                tracing::error!(error = %e, "Failed to persist envelope, message dropped");
                tracing::Span::current().record("otel.status_code", "ERROR");
            }
        }
    }
    .instrument(span)
    .await;
}
