use crate::shared::core::outbox_event::OutboxEvent;
use crate::shared::core::primitives::{Environment, OutboxId};
use crate::shared::infrastructure::outbox::{NewOutboxRecord, OutboxError, OutboxStore};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to serialize {event_type}: {source}")]
    Serialization {
        event_type: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Store(#[from] OutboxError),
}

/// Appends events to the outbox inside the caller's transaction.
///
/// Never commits. Records become visible when the caller commits and vanish
/// when it rolls back.
pub struct EventPublisher<TStore>
where
    TStore: OutboxStore + 'static,
{
    store: Arc<TStore>,
    environment: Environment,
}

impl<TStore> Clone for EventPublisher<TStore>
where
    TStore: OutboxStore + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            environment: self.environment.clone(),
        }
    }
}

impl<TStore> EventPublisher<TStore>
where
    TStore: OutboxStore + 'static,
{
    pub fn new(store: Arc<TStore>, environment: Environment) -> Self {
        Self { store, environment }
    }

    pub async fn publish<TEvent>(
        &self,
        tx: &mut TStore::Tx,
        events: &[TEvent],
    ) -> Result<Vec<OutboxId>, PublishError>
    where
        TEvent: OutboxEvent,
    {
        if events.is_empty() {
            return Ok(Vec::new());
        }

        let occurred_at = Utc::now();
        let records = events
            .iter()
            .map(|event| {
                let payload = event
                    .to_payload()
                    .map_err(|source| PublishError::Serialization {
                        event_type: event.event_type(),
                        source,
                    })?;
                Ok(NewOutboxRecord {
                    event_type: event.event_type().to_string(),
                    occurred_at,
                    environment: self.environment.as_str().to_string(),
                    payload,
                })
            })
            .collect::<Result<Vec<_>, PublishError>>()?;

        let ids = self.store.append(tx, records).await?;
        tracing::debug!(records = ids.len(), "events appended to outbox");
        Ok(ids)
    }
}
