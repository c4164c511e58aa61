//! Redis pub/sub-backed event bus (optional).
//!
//! Note: Redis pub/sub is not durable (messages can be dropped if subscribers
//! are offline), which matches the best-effort, at-least-once contract of the
//! transport. Channels map to `"{topic}.{routing_key}"`, so a subscriber
//! pattern-matches one prefix and filters by routing key like any other
//! consumer.

use std::sync::mpsc;
use std::thread;

use redis::Commands;

use piggybank_events::{Envelope, EventBus, Subscription};

#[derive(Debug)]
pub enum RedisBusError {
    Redis(String),
    Serialize(String),
}

/// Redis pub/sub bus for JSON event envelopes.
#[derive(Debug, Clone)]
pub struct RedisPubSubEventBus {
    client: redis::Client,
    /// Channel pattern subscribed to, e.g. `"piggybank.*"`.
    pattern: String,
}

impl RedisPubSubEventBus {
    pub fn new(
        redis_url: impl AsRef<str>,
        pattern: impl Into<String>,
    ) -> Result<Self, RedisBusError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| RedisBusError::Redis(e.to_string()))?;
        Ok(Self {
            client,
            pattern: pattern.into(),
        })
    }
}

impl EventBus<Envelope> for RedisPubSubEventBus {
    type Error = RedisBusError;

    fn publish(&self, message: Envelope) -> Result<(), Self::Error> {
        let channel = format!("{}.{}", message.topic(), message.routing_key());
        let payload = serde_json::to_string(&message)
            .map_err(|e| RedisBusError::Serialize(e.to_string()))?;

        let mut conn = self
            .client
            .get_connection()
            .map_err(|e| RedisBusError::Redis(e.to_string()))?;

        let _: i64 = conn
            .publish(&channel, payload)
            .map_err(|e| RedisBusError::Redis(e.to_string()))?;

        Ok(())
    }

    fn subscribe(&self) -> Subscription<Envelope> {
        let (tx, rx) = mpsc::channel();

        let client = self.client.clone();
        let pattern = self.pattern.clone();

        // Background thread that receives pub/sub messages and forwards them.
        thread::spawn(move || {
            let mut conn = match client.get_connection() {
                Ok(c) => c,
                Err(_) => return,
            };

            let mut pubsub = conn.as_pubsub();
            if pubsub.psubscribe(pattern).is_err() {
                return;
            }

            loop {
                let msg = match pubsub.get_message() {
                    Ok(m) => m,
                    Err(_) => return,
                };

                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(_) => continue,
                };

                let envelope: Envelope = match serde_json::from_str(&payload) {
                    Ok(e) => e,
                    Err(_) => continue,
                };

                if tx.send(envelope).is_err() {
                    return;
                }
            }
        });

        Subscription::new(rx)
    }
}
