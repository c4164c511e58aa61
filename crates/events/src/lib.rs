//! Integration-event transport mechanics.
//!
//! Domain crates define their typed events and implement [`IntegrationEvent`];
//! this crate provides the envelope and the pub/sub abstraction that moves
//! them between services.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::{DecodeError, Envelope};
pub use event::IntegrationEvent;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
