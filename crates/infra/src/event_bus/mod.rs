//! Event-bus transports.
//!
//! The in-memory bus (from `piggybank-events`) is the default; the Redis
//! pub/sub bus carries envelopes across processes when the `redis` feature is
//! enabled and `REDIS_URL` is configured.

#[cfg(feature = "redis")]
pub mod redis_pubsub;

#[cfg(feature = "redis")]
pub use redis_pubsub::{RedisBusError, RedisPubSubEventBus};
