// Contract between a producing module's event type and the outbox.
//
// Each module exposes its events as one closed enum and implements this trait
// on it, so the mapping to an event type tag and to the serialized payload is
// an exhaustive match checked at compile time.

pub trait OutboxEvent: Send + Sync {
    /// Tag identifying the payload schema, stored as `event_type`.
    fn event_type(&self) -> &'static str;

    /// Serialized payload, stored verbatim and forwarded byte for byte.
    fn to_payload(&self) -> Result<String, serde_json::Error>;
}
