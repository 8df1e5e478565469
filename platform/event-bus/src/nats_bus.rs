//! NATS-based implementation of the EventBus trait

use crate::{BusError, BusMessage, BusResult, EventBus, MessageHeaders};
use async_nats::{Client, HeaderMap};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};

/// EventBus implementation backed by a NATS connection
///
/// This is the production implementation. It wraps an already-connected
/// `async_nats::Client` and implements the `EventBus` trait.
///
/// # Example
/// ```rust,no_run
/// use event_bus::{EventBus, NatsBus};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let nats_client = async_nats::connect("nats://localhost:4222").await?;
/// let bus = NatsBus::new(nats_client);
///
/// bus.publish("person.registered", b"{}".to_vec()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct NatsBus {
    client: Client,
}

impl NatsBus {
    /// Create a new NatsBus from an existing NATS client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Get a reference to the underlying NATS client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Convert an opaque header map into NATS headers.
    ///
    /// NATS headers are string-valued on the wire; values that are not valid
    /// UTF-8 cannot be represented and are skipped with a warning.
    fn to_nats_headers(headers: &MessageHeaders) -> HeaderMap {
        let mut nats_headers = HeaderMap::new();
        for (key, value) in headers {
            match std::str::from_utf8(value) {
                Ok(value) => nats_headers.insert(key.as_str(), value),
                Err(_) => {
                    tracing::warn!(header = %key, "dropping non-UTF-8 header value on publish");
                }
            }
        }
        nats_headers
    }
}

#[async_trait]
impl EventBus for NatsBus {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> BusResult<()> {
        self.client
            .publish(subject.to_string(), payload.into())
            .await
            .map_err(|e| BusError::PublishError(e.to_string()))?;

        Ok(())
    }

    async fn publish_with_headers(
        &self,
        subject: &str,
        payload: Vec<u8>,
        headers: MessageHeaders,
    ) -> BusResult<()> {
        let nats_headers = Self::to_nats_headers(&headers);

        self.client
            .publish_with_headers(subject.to_string(), nats_headers, payload.into())
            .await
            .map_err(|e| BusError::PublishError(e.to_string()))?;

        Ok(())
    }

    async fn subscribe(&self, subject: &str) -> BusResult<BoxStream<'static, BusMessage>> {
        let subscriber = self
            .client
            .subscribe(subject.to_string())
            .await
            .map_err(|e| BusError::SubscribeError(e.to_string()))?;

        // Convert NATS messages to BusMessages
        let stream = subscriber.map(|nats_msg| {
            let mut msg = BusMessage::new(nats_msg.subject.to_string(), nats_msg.payload.to_vec());

            // Extract headers if present
            if let Some(nats_headers) = nats_msg.headers {
                let mut headers = MessageHeaders::new();
                for (key, values) in nats_headers.iter() {
                    // Take the first value for each header
                    if let Some(value) = values.first() {
                        headers.insert(key.to_string(), value.to_string().into_bytes());
                    }
                }
                if !headers.is_empty() {
                    msg = msg.with_headers(headers);
                }
            }

            msg
        });

        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Note: These tests require a running NATS server
    // For CI, use InMemoryBus tests instead
    // For manual testing: docker run -p 4222:4222 nats:2.10-alpine

    #[tokio::test]
    #[ignore] // Requires NATS server
    async fn test_nats_bus_publish_subscribe_with_headers() {
        let client = async_nats::connect("nats://localhost:4222")
            .await
            .expect("NATS server must be running on localhost:4222");

        let bus = NatsBus::new(client);

        // Subscribe first
        let mut stream = bus.subscribe("test.nats.person").await.unwrap();

        // Publish a message with a trace header
        let payload = b"test message".to_vec();
        let mut headers = MessageHeaders::new();
        headers.insert(
            "traceparent".to_string(),
            b"00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01".to_vec(),
        );
        bus.publish_with_headers("test.nats.person", payload.clone(), headers)
            .await
            .unwrap();

        // Receive the message
        let msg = tokio::time::timeout(std::time::Duration::from_secs(2), stream.next())
            .await
            .expect("timeout waiting for message")
            .expect("stream ended");

        assert_eq!(msg.subject, "test.nats.person");
        assert_eq!(msg.payload, payload);
        assert!(msg
            .headers
            .as_ref()
            .and_then(|h| h.get("traceparent"))
            .is_some());
    }
}
