// Outbox drainer.
//
// Purpose
// - Forward committed outbox records to the event log at least once.
//
// Responsibilities
// - Claim a batch under a lease, send it with no transaction held, then mark
//   exactly that batch processed.
// - Repeat until the backlog is empty or the run's batch or time budget is
//   spent.
// - Leave a batch pending, and release its lease, when the sink fails or
//   times out.
//
// Safe to run from several workers at once: a record under a live lease is
// never claimed by another worker.

use crate::shared::core::primitives::OutboxId;
use crate::shared::infrastructure::event_log::{EventLogError, EventLogRow, EventLogSink};
use crate::shared::infrastructure::outbox::{OutboxError, OutboxStore};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainerConfig {
    pub batch_size: usize,
    pub lease: Duration,
    pub sink_timeout: Duration,
    pub max_batches_per_run: usize,
    pub run_budget: Duration,
}

impl Default for DrainerConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            lease: Duration::from_secs(30),
            sink_timeout: Duration::from_secs(10),
            max_batches_per_run: 50,
            run_budget: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DrainerConfigError {
    #[error("batch_size must be greater than zero")]
    ZeroBatchSize,

    #[error("max_batches_per_run must be greater than zero")]
    ZeroMaxBatchesPerRun,

    #[error("sink_timeout must be greater than zero")]
    ZeroSinkTimeout,

    #[error("run_budget must be greater than zero")]
    ZeroRunBudget,

    #[error("lease ({lease:?}) must be longer than sink_timeout ({sink_timeout:?})")]
    LeaseNotLongerThanSinkTimeout {
        lease: Duration,
        sink_timeout: Duration,
    },
}

impl DrainerConfig {
    pub fn validate(&self) -> Result<(), DrainerConfigError> {
        if self.batch_size == 0 {
            return Err(DrainerConfigError::ZeroBatchSize);
        }
        if self.max_batches_per_run == 0 {
            return Err(DrainerConfigError::ZeroMaxBatchesPerRun);
        }
        if self.sink_timeout.is_zero() {
            return Err(DrainerConfigError::ZeroSinkTimeout);
        }
        if self.run_budget.is_zero() {
            return Err(DrainerConfigError::ZeroRunBudget);
        }
        if self.lease <= self.sink_timeout {
            return Err(DrainerConfigError::LeaseNotLongerThanSinkTimeout {
                lease: self.lease,
                sink_timeout: self.sink_timeout,
            });
        }
        Ok(())
    }
}

/// `delivered` counts records from earlier batches of the same run. Those
/// stay processed.
#[derive(Debug, Error)]
pub enum DrainError {
    #[error("batch size must be greater than zero")]
    InvalidBatchSize,

    #[error("failed to claim outbox records after delivering {delivered}: {source}")]
    Claim {
        delivered: usize,
        #[source]
        source: OutboxError,
    },

    #[error("event log rejected a batch after delivering {delivered}: {source}")]
    Sink {
        delivered: usize,
        #[source]
        source: EventLogError,
    },

    #[error("event log did not answer within {timeout:?} after delivering {delivered}")]
    SinkTimeout { delivered: usize, timeout: Duration },

    #[error("failed to mark a delivered batch after delivering {delivered}: {source}")]
    Mark {
        delivered: usize,
        #[source]
        source: OutboxError,
    },
}

impl DrainError {
    pub fn delivered(&self) -> usize {
        match self {
            DrainError::InvalidBatchSize => 0,
            DrainError::Claim { delivered, .. }
            | DrainError::Sink { delivered, .. }
            | DrainError::SinkTimeout { delivered, .. }
            | DrainError::Mark { delivered, .. } => *delivered,
        }
    }
}

pub struct OutboxDrainer<TStore, TSink>
where
    TStore: OutboxStore + 'static,
    TSink: EventLogSink + 'static,
{
    store: Arc<TStore>,
    sink: Arc<TSink>,
    config: DrainerConfig,
    worker_id: String,
}

impl<TStore, TSink> OutboxDrainer<TStore, TSink>
where
    TStore: OutboxStore + 'static,
    TSink: EventLogSink + 'static,
{
    pub fn new(store: Arc<TStore>, sink: Arc<TSink>, config: DrainerConfig) -> Self {
        Self {
            store,
            sink,
            config,
            worker_id: format!("drainer-{}", Uuid::now_v7()),
        }
    }

    pub fn with_worker_id(mut self, worker_id: impl Into<String>) -> Self {
        self.worker_id = worker_id.into();
        self
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Drains with the configured batch size. Returns the number of records
    /// delivered and marked processed.
    #[tracing::instrument(name = "outbox_drain", skip(self), fields(worker = %self.worker_id))]
    pub async fn drain(&self) -> Result<usize, DrainError> {
        self.drain_with_batch_size(self.config.batch_size).await
    }

    pub async fn drain_with_batch_size(&self, batch_size: usize) -> Result<usize, DrainError> {
        if batch_size == 0 {
            return Err(DrainError::InvalidBatchSize);
        }

        let started = Instant::now();
        let mut delivered = 0;

        for batch in 1..=self.config.max_batches_per_run {
            if started.elapsed() >= self.config.run_budget {
                tracing::info!(delivered, batch, "run budget spent");
                break;
            }

            let records = self
                .store
                .claim_pending(&self.worker_id, batch_size, self.config.lease)
                .await
                .map_err(|source| DrainError::Claim { delivered, source })?;
            if records.is_empty() {
                break;
            }

            let claimed = records.len();
            let ids: Vec<OutboxId> = records.iter().map(|record| record.id).collect();
            let rows: Vec<EventLogRow> = records.iter().map(EventLogRow::from).collect();
            tracing::debug!(batch, records = claimed, "batch claimed");

            match tokio::time::timeout(self.config.sink_timeout, self.sink.insert(&rows)).await {
                Ok(Ok(())) => {}
                Ok(Err(source)) => {
                    tracing::warn!(batch, delivered, error = %source, "event log rejected batch");
                    self.release(&ids).await;
                    return Err(DrainError::Sink { delivered, source });
                }
                Err(_) => {
                    tracing::warn!(
                        batch,
                        delivered,
                        timeout = ?self.config.sink_timeout,
                        "event log timed out"
                    );
                    self.release(&ids).await;
                    return Err(DrainError::SinkTimeout {
                        delivered,
                        timeout: self.config.sink_timeout,
                    });
                }
            }

            self.store
                .mark_processed(&ids)
                .await
                .map_err(|source| DrainError::Mark { delivered, source })?;
            delivered += claimed;
            tracing::info!(batch, records = claimed, delivered, "batch delivered");

            if claimed < batch_size {
                break;
            }
        }

        Ok(delivered)
    }

    /// Best effort. A lease that cannot be released simply expires.
    async fn release(&self, ids: &[OutboxId]) {
        if let Err(error) = self.store.release(&self.worker_id, ids).await {
            tracing::warn!(error = %error, "failed to release claimed records");
        }
    }
}
