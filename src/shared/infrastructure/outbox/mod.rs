use crate::shared::core::primitives::OutboxId;
use crate::shared::infrastructure::database::{TransactionError, TransactionManager};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxRecord {
    pub id: OutboxId,
    pub event_type: String,
    pub occurred_at: DateTime<Utc>,
    pub environment: String,
    pub payload: String,
    pub processed: bool,
    pub claimed_by: Option<String>,
    pub claimed_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOutboxRecord {
    pub event_type: String,
    pub occurred_at: DateTime<Utc>,
    pub environment: String,
    pub payload: String,
}

impl NewOutboxRecord {
    pub fn validate(&self) -> Result<(), OutboxError> {
        if self.event_type.trim().is_empty() {
            return Err(OutboxError::Validation("event_type must not be empty".into()));
        }
        if self.environment.trim().is_empty() {
            return Err(OutboxError::Validation("environment must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum OutboxError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unknown outbox records: {0:?}")]
    UnknownRecords(Vec<OutboxId>),

    #[error("transient backend error: {0}")]
    Transient(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl From<TransactionError> for OutboxError {
    fn from(error: TransactionError) -> Self {
        match error {
            TransactionError::Unavailable(message) => OutboxError::Transient(message),
            TransactionError::Backend(message) => OutboxError::Backend(message),
        }
    }
}

/// Durable table of event records awaiting delivery.
///
/// `append` joins the caller's transaction. The drainer operations each run in
/// their own short transaction and never hold one across the sink call.
#[async_trait]
pub trait OutboxStore: TransactionManager {
    async fn append(
        &self,
        tx: &mut Self::Tx,
        records: Vec<NewOutboxRecord>,
    ) -> Result<Vec<OutboxId>, OutboxError>;

    /// Leases up to `limit` unprocessed records whose lease is absent or
    /// expired, ordered by id.
    async fn claim_pending(
        &self,
        worker: &str,
        limit: usize,
        lease: Duration,
    ) -> Result<Vec<OutboxRecord>, OutboxError>;

    /// Flags every id as processed and clears its lease. Either all ids are
    /// updated or none are.
    async fn mark_processed(&self, ids: &[OutboxId]) -> Result<u64, OutboxError>;

    /// Drops `worker`'s lease on the given unprocessed records.
    async fn release(&self, worker: &str, ids: &[OutboxId]) -> Result<u64, OutboxError>;

    async fn find_by_ids(&self, ids: &[OutboxId]) -> Result<Vec<OutboxRecord>, OutboxError>;

    async fn list_pending(&self, limit: usize) -> Result<Vec<OutboxRecord>, OutboxError>;
}

pub mod in_memory;
pub mod postgres;
