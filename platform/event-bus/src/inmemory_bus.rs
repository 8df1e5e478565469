//! In-memory implementation of the EventBus trait for testing and development

use crate::{BusMessage, BusResult, EventBus, MessageHeaders};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast;

/// EventBus implementation using in-memory channels
///
/// This implementation is suitable for:
/// - Unit tests (no external dependencies)
/// - Local development without Docker
/// - Integration tests that need fast, isolated message buses
///
/// Messages are broadcast to all subscribers via Tokio broadcast channels.
/// Unlike the NATS transport, header values here may be arbitrary bytes,
/// which the consumer tests rely on to exercise malformed-header handling.
///
/// # Example
/// ```rust
/// use event_bus::{EventBus, InMemoryBus};
/// use futures::StreamExt;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let bus = InMemoryBus::new();
///
/// // Subscribe before publishing
/// let mut stream = bus.subscribe("person.registered").await?;
///
/// // Publish a message
/// bus.publish("person.registered", b"{}".to_vec()).await?;
///
/// // Receive it
/// let msg = stream.next().await.unwrap();
/// assert_eq!(msg.subject, "person.registered");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct InMemoryBus {
    // Global broadcast channel for all messages
    // We use a broadcast channel with a large buffer to avoid dropping messages
    sender: Arc<broadcast::Sender<BusMessage>>,
}

impl InMemoryBus {
    /// Create a new in-memory event bus
    ///
    /// The bus uses a broadcast channel with a buffer of 1000 messages.
    /// If this buffer is exceeded, the oldest messages will be dropped.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1000);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Check if a subject matches a subscription pattern
    ///
    /// Supports NATS-style wildcards:
    /// - `*` matches exactly one token
    /// - `>` matches one or more tokens
    fn matches_pattern(subject: &str, pattern: &str) -> bool {
        let subject_tokens: Vec<&str> = subject.split('.').collect();
        let pattern_tokens: Vec<&str> = pattern.split('.').collect();

        let mut s_idx = 0;
        let mut p_idx = 0;

        while s_idx < subject_tokens.len() && p_idx < pattern_tokens.len() {
            let pattern_token = pattern_tokens[p_idx];

            if pattern_token == ">" {
                // `>` matches all remaining tokens
                return true;
            } else if pattern_token == "*" || subject_tokens[s_idx] == pattern_token {
                s_idx += 1;
                p_idx += 1;
            } else {
                return false;
            }
        }

        // Both must be exhausted for a full match (unless pattern ended with `>`)
        s_idx == subject_tokens.len() && p_idx == pattern_tokens.len()
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for InMemoryBus {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> BusResult<()> {
        let msg = BusMessage::new(subject.to_string(), payload);

        // Broadcast to all subscribers
        // We ignore the error if there are no receivers (that's fine)
        let _ = self.sender.send(msg);

        Ok(())
    }

    async fn publish_with_headers(
        &self,
        subject: &str,
        payload: Vec<u8>,
        headers: MessageHeaders,
    ) -> BusResult<()> {
        let msg = BusMessage::new(subject.to_string(), payload).with_headers(headers);

        let _ = self.sender.send(msg);

        Ok(())
    }

    async fn subscribe(&self, pattern: &str) -> BusResult<BoxStream<'static, BusMessage>> {
        let mut receiver = self.sender.subscribe();
        let pattern = pattern.to_string();

        // Filter messages based on the subscription pattern
        let stream = async_stream::stream! {
            loop {
                match receiver.recv().await {
                    Ok(msg) => {
                        if Self::matches_pattern(&msg.subject, &pattern) {
                            yield msg;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "InMemoryBus subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        // Channel closed, end the stream
                        break;
                    }
                }
            }
        };

        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_pattern_matching() {
        // Exact match
        assert!(InMemoryBus::matches_pattern(
            "person.registered",
            "person.registered"
        ));

        // Single wildcard
        assert!(InMemoryBus::matches_pattern(
            "person.registered",
            "person.*"
        ));
        assert!(!InMemoryBus::matches_pattern(
            "person.registered.v2",
            "person.*"
        ));

        // Multi-level wildcard
        assert!(InMemoryBus::matches_pattern(
            "person.registered.v2",
            "person.>"
        ));
        assert!(!InMemoryBus::matches_pattern(
            "invoice.issued",
            "person.>"
        ));

        // Edge cases
        assert!(InMemoryBus::matches_pattern("single", "single"));
        assert!(InMemoryBus::matches_pattern("single", "*"));
        assert!(InMemoryBus::matches_pattern("single", ">"));
        assert!(!InMemoryBus::matches_pattern("one.two", "one"));
    }

    #[tokio::test]
    async fn test_publish_and_subscribe() {
        let bus = InMemoryBus::new();

        // Subscribe first
        let mut stream = bus.subscribe("person.registered").await.unwrap();

        // Publish a message
        let payload = b"test message".to_vec();
        bus.publish("person.registered", payload.clone())
            .await
            .unwrap();

        // Receive the message
        let msg = tokio::time::timeout(std::time::Duration::from_secs(1), stream.next())
            .await
            .expect("timeout")
            .expect("stream ended");

        assert_eq!(msg.subject, "person.registered");
        assert_eq!(msg.payload, payload);
        assert!(msg.headers.is_none());
    }

    #[tokio::test]
    async fn test_headers_survive_delivery() {
        let bus = InMemoryBus::new();
        let mut stream = bus.subscribe("person.registered").await.unwrap();

        let mut headers = MessageHeaders::new();
        headers.insert("traceparent".to_string(), b"not-checked-here".to_vec());
        // Header values are opaque bytes: non-UTF-8 must survive delivery
        headers.insert("binary".to_string(), vec![0xff, 0xfe, 0x00]);

        bus.publish_with_headers("person.registered", b"{}".to_vec(), headers)
            .await
            .unwrap();

        let msg = tokio::time::timeout(std::time::Duration::from_secs(1), stream.next())
            .await
            .expect("timeout")
            .expect("stream ended");

        let headers = msg.headers.expect("headers present");
        assert_eq!(
            headers.get("traceparent").map(Vec::as_slice),
            Some(b"not-checked-here".as_slice())
        );
        assert_eq!(
            headers.get("binary").map(Vec::as_slice),
            Some([0xff, 0xfe, 0x00].as_slice())
        );
    }

    #[tokio::test]
    async fn test_multiple_messages_in_order() {
        let bus = InMemoryBus::new();
        let mut stream = bus.subscribe("person.>").await.unwrap();

        // Publish multiple messages
        for i in 0..5 {
            let payload = format!("message {}", i).into_bytes();
            bus.publish(&format!("person.msg.{}", i), payload)
                .await
                .unwrap();
        }

        // Verify order
        for i in 0..5 {
            let msg = tokio::time::timeout(std::time::Duration::from_secs(1), stream.next())
                .await
                .expect("timeout")
                .expect("stream ended");

            assert_eq!(msg.subject, format!("person.msg.{}", i));
            assert_eq!(msg.payload, format!("message {}", i).into_bytes());
        }
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = InMemoryBus::new();

        // Create two subscribers
        let mut stream1 = bus.subscribe("person.>").await.unwrap();
        let mut stream2 = bus.subscribe("person.>").await.unwrap();

        // Publish a message
        let payload = b"broadcast".to_vec();
        bus.publish("person.registered", payload.clone())
            .await
            .unwrap();

        // Both should receive it
        let msg1 = tokio::time::timeout(std::time::Duration::from_secs(1), stream1.next())
            .await
            .expect("timeout")
            .expect("stream ended");
        let msg2 = tokio::time::timeout(std::time::Duration::from_secs(1), stream2.next())
            .await
            .expect("timeout")
            .expect("stream ended");

        assert_eq!(msg1.payload, payload);
        assert_eq!(msg2.payload, payload);
    }

    #[tokio::test]
    async fn test_non_matching_subject_filtered_out() {
        let bus = InMemoryBus::new();
        let mut stream = bus.subscribe("person.registered").await.unwrap();

        bus.publish("invoice.issued", b"no match".to_vec())
            .await
            .unwrap();
        bus.publish("person.registered", b"match".to_vec())
            .await
            .unwrap();

        let msg = tokio::time::timeout(std::time::Duration::from_millis(500), stream.next())
            .await
            .expect("timeout")
            .expect("stream ended");
        assert_eq!(msg.payload, b"match".to_vec());

        // No further messages should arrive
        let result =
            tokio::time::timeout(std::time::Duration::from_millis(100), stream.next()).await;
        assert!(result.is_err(), "should timeout, no more messages");
    }
}
