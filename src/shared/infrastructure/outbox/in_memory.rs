use crate::shared::core::primitives::OutboxId;
use crate::shared::infrastructure::database::TransactionManager;
use crate::shared::infrastructure::database::in_memory::{InMemoryDatabase, InMemoryTransaction};
use crate::shared::infrastructure::outbox::{
    NewOutboxRecord, OutboxError, OutboxRecord, OutboxStore,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeSet;
use std::time::Duration;

impl<T> InMemoryDatabase<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Every committed outbox record, processed or not, ordered by id.
    pub async fn outbox_records(&self) -> Result<Vec<OutboxRecord>, OutboxError> {
        let tx = self.begin().await?;
        let records = tx.tables().outbox.values().cloned().collect();
        self.rollback(tx).await?;
        Ok(records)
    }
}

#[async_trait]
impl<T> OutboxStore for InMemoryDatabase<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn append(
        &self,
        tx: &mut InMemoryTransaction<T>,
        records: Vec<NewOutboxRecord>,
    ) -> Result<Vec<OutboxId>, OutboxError> {
        if self.is_outbox_offline {
            return Err(OutboxError::Transient("Outbox offline".into()));
        }
        for record in &records {
            record.validate()?;
        }

        let tables = tx.tables_mut();
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            tables.last_outbox_id += 1;
            let id = tables.last_outbox_id;
            tables.outbox.insert(
                id,
                OutboxRecord {
                    id,
                    event_type: record.event_type,
                    occurred_at: record.occurred_at,
                    environment: record.environment,
                    payload: record.payload,
                    processed: false,
                    claimed_by: None,
                    claimed_until: None,
                },
            );
            ids.push(id);
        }
        Ok(ids)
    }

    async fn claim_pending(
        &self,
        worker: &str,
        limit: usize,
        lease: Duration,
    ) -> Result<Vec<OutboxRecord>, OutboxError> {
        let lease = chrono::Duration::from_std(lease)
            .map_err(|e| OutboxError::Validation(format!("lease out of range: {e}")))?;
        let mut tx = self.begin().await?;
        let now = Utc::now();
        let claimed_until = now + lease;

        let claimed = tx
            .tables_mut()
            .outbox
            .values_mut()
            .filter(|record| !record.processed)
            .filter(|record| record.claimed_until.is_none_or(|until| until <= now))
            .take(limit)
            .map(|record| {
                record.claimed_by = Some(worker.to_string());
                record.claimed_until = Some(claimed_until);
                record.clone()
            })
            .collect();

        self.commit(tx).await?;
        Ok(claimed)
    }

    async fn mark_processed(&self, ids: &[OutboxId]) -> Result<u64, OutboxError> {
        if self.is_marking_offline {
            return Err(OutboxError::Transient("Outbox marking offline".into()));
        }
        if ids.is_empty() {
            return Ok(0);
        }
        let ids: BTreeSet<OutboxId> = ids.iter().copied().collect();
        let mut tx = self.begin().await?;

        let unknown: Vec<OutboxId> = ids
            .iter()
            .copied()
            .filter(|id| !tx.tables().outbox.contains_key(id))
            .collect();
        if !unknown.is_empty() {
            self.rollback(tx).await?;
            return Err(OutboxError::UnknownRecords(unknown));
        }

        let outbox = &mut tx.tables_mut().outbox;
        for id in &ids {
            if let Some(record) = outbox.get_mut(id) {
                record.processed = true;
                record.claimed_by = None;
                record.claimed_until = None;
            }
        }

        self.commit(tx).await?;
        Ok(ids.len() as u64)
    }

    async fn release(&self, worker: &str, ids: &[OutboxId]) -> Result<u64, OutboxError> {
        let mut tx = self.begin().await?;
        let outbox = &mut tx.tables_mut().outbox;
        let mut released = 0;
        for id in ids {
            if let Some(record) = outbox.get_mut(id) {
                if !record.processed && record.claimed_by.as_deref() == Some(worker) {
                    record.claimed_by = None;
                    record.claimed_until = None;
                    released += 1;
                }
            }
        }
        self.commit(tx).await?;
        Ok(released)
    }

    async fn find_by_ids(&self, ids: &[OutboxId]) -> Result<Vec<OutboxRecord>, OutboxError> {
        let ids: BTreeSet<OutboxId> = ids.iter().copied().collect();
        let tx = self.begin().await?;
        let records = ids
            .iter()
            .filter_map(|id| tx.tables().outbox.get(id).cloned())
            .collect();
        self.rollback(tx).await?;
        Ok(records)
    }

    async fn list_pending(&self, limit: usize) -> Result<Vec<OutboxRecord>, OutboxError> {
        let tx = self.begin().await?;
        let records = tx
            .tables()
            .outbox
            .values()
            .filter(|record| !record.processed)
            .take(limit)
            .cloned()
            .collect();
        self.rollback(tx).await?;
        Ok(records)
    }
}
