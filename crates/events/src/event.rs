/// A typed integration event, addressable on a topic exchange.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **versioned** (schema evolution)
/// - routed by `(topic, routing_key)` rather than by stream position
pub trait IntegrationEvent: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Topic (exchange) the event is published on, e.g. `"piggybank.accounts"`.
    fn topic(&self) -> &'static str;

    /// Routing key within the topic, e.g. `"account.updated"`.
    fn routing_key(&self) -> &'static str;

    /// Stable discriminator carried inside the payload, e.g. `"ACCOUNT_UPDATED"`.
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32 {
        1
    }
}
