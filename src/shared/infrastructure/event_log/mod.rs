// Port to the external event log the drainer forwards outbox records to.
//
// The sink is append-only and owns deduplication. A successful `insert` means
// the whole batch was accepted; any error means the batch must be treated as
// not delivered.

use crate::shared::infrastructure::outbox::OutboxRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLogRow {
    pub event_type: String,
    pub occurred_at: DateTime<Utc>,
    pub environment: String,
    pub payload: String,
}

impl From<&OutboxRecord> for EventLogRow {
    fn from(record: &OutboxRecord) -> Self {
        Self {
            event_type: record.event_type.clone(),
            occurred_at: record.occurred_at,
            environment: record.environment.clone(),
            payload: record.payload.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("event log unavailable: {0}")]
    Unavailable(String),

    #[error("event log rejected the batch with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("failed to encode batch: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[async_trait]
pub trait EventLogSink: Send + Sync {
    async fn insert(&self, rows: &[EventLogRow]) -> Result<(), EventLogError>;
}

pub mod clickhouse;
pub mod in_memory;
