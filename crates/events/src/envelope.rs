use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use crate::event::IntegrationEvent;

/// Envelope for an integration event in transit.
///
/// This is the unit that crosses the bus. The payload is the serialized typed
/// event (including its `eventType` discriminator); topic and routing key are
/// duplicated on the envelope so transports and consumers can route without
/// touching the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    event_id: Uuid,
    topic: String,
    routing_key: String,
    payload: JsonValue,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The payload did not match the expected event schema.
    ///
    /// Consumers treat this as fail-closed: log and drop the message.
    #[error("event payload rejected: {0}")]
    Payload(String),
}

impl Envelope {
    pub fn new(
        event_id: Uuid,
        topic: impl Into<String>,
        routing_key: impl Into<String>,
        payload: JsonValue,
    ) -> Self {
        Self {
            event_id,
            topic: topic.into(),
            routing_key: routing_key.into(),
            payload,
        }
    }

    /// Wrap a typed event, serializing its payload.
    ///
    /// Serialization of a domain event cannot fail for the event types defined
    /// in this workspace (plain data, no non-string map keys), so a failure
    /// here is reported as a payload error rather than panicking.
    pub fn from_event<E>(event: &E) -> Result<Self, DecodeError>
    where
        E: IntegrationEvent + Serialize,
    {
        let payload =
            serde_json::to_value(event).map_err(|e| DecodeError::Payload(e.to_string()))?;
        Ok(Self::new(
            Uuid::now_v7(),
            event.topic(),
            event.routing_key(),
            payload,
        ))
    }

    /// Strict decode into a typed event.
    ///
    /// Missing required fields fail the decode; unknown extra fields are
    /// tolerated. Callers drop (and log) rejected messages instead of
    /// guessing at defaults.
    pub fn decode<E>(&self) -> Result<E, DecodeError>
    where
        E: DeserializeOwned,
    {
        serde_json::from_value(self.payload.clone())
            .map_err(|e| DecodeError::Payload(e.to_string()))
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    pub fn payload(&self) -> &JsonValue {
        &self.payload
    }
}
