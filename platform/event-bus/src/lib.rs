//! # EventBus Abstraction
//!
//! A platform-level abstraction for message-bus communication between the
//! ingress producer and the consumer worker.
//!
//! ## Implementations
//!
//! - **NatsBus**: Production implementation backed by a NATS connection
//! - **InMemoryBus**: Test/dev implementation using in-memory channels
//!
//! Messages carry an optional header map with *opaque byte* values. The
//! consumer side must tolerate headers that are not valid UTF-8, so the
//! abstraction never assumes header values are strings; the [`propagation`]
//! module does the lossy interpretation at the edge where it belongs.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use event_bus::{EventBus, NatsBus, InMemoryBus};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Production: NATS
//! let nats_client = async_nats::connect("nats://localhost:4222").await?;
//! let bus: Arc<dyn EventBus> = Arc::new(NatsBus::new(nats_client));
//!
//! // Dev/Test: In-Memory
//! let bus: Arc<dyn EventBus> = Arc::new(InMemoryBus::new());
//!
//! // Publish a message
//! bus.publish("person.registered", b"{}".to_vec()).await?;
//!
//! // Subscribe to the subject
//! let mut stream = bus.subscribe("person.registered").await?;
//! while let Some(msg) = futures::StreamExt::next(&mut stream).await {
//!     println!("Received: {} bytes on {}", msg.payload.len(), msg.subject);
//! }
//! # Ok(())
//! # }
//! ```

mod inmemory_bus;
mod nats_bus;
pub mod propagation;

pub use inmemory_bus::InMemoryBus;
pub use nats_bus::NatsBus;
pub use propagation::{Baggage, TraceContext, TraceParent};

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::collections::HashMap;
use std::fmt;

/// Header map attached to a bus message.
///
/// Values are raw bytes: the transport does not guarantee UTF-8, and the
/// consumer contract requires tolerating malformed values without failing.
pub type MessageHeaders = HashMap<String, Vec<u8>>;

/// A message received from the event bus
#[derive(Debug, Clone)]
pub struct BusMessage {
    /// The subject this message was published to
    pub subject: String,
    /// The message payload (raw bytes)
    pub payload: Vec<u8>,
    /// Optional transport headers (trace context, correlation metadata)
    pub headers: Option<MessageHeaders>,
}

impl BusMessage {
    /// Create a new bus message
    pub fn new(subject: String, payload: Vec<u8>) -> Self {
        Self {
            subject,
            payload,
            headers: None,
        }
    }

    /// Add headers to the message
    pub fn with_headers(mut self, headers: MessageHeaders) -> Self {
        self.headers = Some(headers);
        self
    }
}

/// Errors that can occur when using the event bus
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("failed to publish message: {0}")]
    PublishError(String),

    #[error("failed to subscribe to subject: {0}")]
    SubscribeError(String),

    #[error("connection error: {0}")]
    ConnectionError(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

/// Result type for event bus operations
pub type BusResult<T> = Result<T, BusError>;

/// Core event bus abstraction for publish-subscribe messaging
///
/// This trait defines the interface that all bus implementations must
/// satisfy. Publishing with headers is a separate operation so that the
/// common no-header path stays trivial.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish a message to a subject
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> BusResult<()>;

    /// Publish a message together with transport headers
    ///
    /// The producer uses this to attach trace-context headers; see
    /// [`propagation::inject`].
    async fn publish_with_headers(
        &self,
        subject: &str,
        payload: Vec<u8>,
        headers: MessageHeaders,
    ) -> BusResult<()>;

    /// Subscribe to messages on a subject
    ///
    /// Returns a continuous stream of [`BusMessage`]s. Dropping the stream
    /// releases the subscription.
    async fn subscribe(&self, subject: &str) -> BusResult<BoxStream<'static, BusMessage>>;
}

impl fmt::Debug for dyn EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventBus")
    }
}
