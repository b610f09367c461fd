// In memory transactional database.
//
// Purpose
// - Give use cases, the publisher and the drainer a real transaction
//   boundary without running Postgres.
//
// Responsibilities
// - Hold the outbox table next to a module-supplied business table `T`.
// - Serialise transactions: `begin` takes the table lock and keeps it until
//   commit or rollback.
// - Roll back by restoring the snapshot taken at `begin`, also on drop.

use crate::shared::core::primitives::OutboxId;
use crate::shared::infrastructure::database::{TransactionError, TransactionManager};
use crate::shared::infrastructure::outbox::OutboxRecord;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
pub struct InMemoryTables<T> {
    pub(crate) outbox: BTreeMap<OutboxId, OutboxRecord>,
    pub(crate) last_outbox_id: OutboxId,
    pub(crate) business: T,
}

pub struct InMemoryTransaction<T> {
    guard: OwnedMutexGuard<InMemoryTables<T>>,
    snapshot: Option<InMemoryTables<T>>,
}

impl<T> InMemoryTransaction<T> {
    pub(crate) fn tables(&self) -> &InMemoryTables<T> {
        &self.guard
    }

    pub(crate) fn tables_mut(&mut self) -> &mut InMemoryTables<T> {
        &mut self.guard
    }

    fn finish(mut self) {
        self.snapshot = None;
    }
}

impl<T> Drop for InMemoryTransaction<T> {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
    }
}

pub struct InMemoryDatabase<T> {
    tables: Arc<Mutex<InMemoryTables<T>>>,
    is_offline: bool,
    pub(crate) is_outbox_offline: bool,
    pub(crate) is_marking_offline: bool,
}

impl<T: Default> Default for InMemoryDatabase<T> {
    fn default() -> Self {
        Self {
            tables: Arc::new(Mutex::new(InMemoryTables::default())),
            is_offline: false,
            is_outbox_offline: false,
            is_marking_offline: false,
        }
    }
}

impl<T: Default> InMemoryDatabase<T> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T> InMemoryDatabase<T> {
    /// Every transaction fails to start.
    pub fn toggle_offline(&mut self) {
        self.is_offline = !self.is_offline;
    }

    /// Outbox appends fail; the rest of the transaction still works.
    pub fn toggle_outbox_offline(&mut self) {
        self.is_outbox_offline = !self.is_outbox_offline;
    }

    /// The drainer's mark phase fails; claims still work.
    pub fn toggle_marking_offline(&mut self) {
        self.is_marking_offline = !self.is_marking_offline;
    }
}

#[async_trait]
impl<T> TransactionManager for InMemoryDatabase<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Tx = InMemoryTransaction<T>;

    async fn begin(&self) -> Result<Self::Tx, TransactionError> {
        if self.is_offline {
            return Err(TransactionError::Unavailable("Database offline".into()));
        }
        let guard = self.tables.clone().lock_owned().await;
        let snapshot = Some(guard.clone());
        Ok(InMemoryTransaction { guard, snapshot })
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), TransactionError> {
        tx.finish();
        Ok(())
    }

    async fn rollback(&self, tx: Self::Tx) -> Result<(), TransactionError> {
        drop(tx);
        Ok(())
    }
}
