// Transaction port shared by every store that must take part in the same
// atomic unit of work as the outbox.
//
// The business tables and the outbox table live behind one
// `TransactionManager`, so a use case's write and its outbox append commit or
// roll back together. A transaction dropped without `commit` rolls back.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("database unavailable: {0}")]
    Unavailable(String),

    #[error("backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait TransactionManager: Send + Sync {
    type Tx: Send;

    async fn begin(&self) -> Result<Self::Tx, TransactionError>;
    async fn commit(&self, tx: Self::Tx) -> Result<(), TransactionError>;
    async fn rollback(&self, tx: Self::Tx) -> Result<(), TransactionError>;
}

pub mod in_memory;
pub mod postgres;
