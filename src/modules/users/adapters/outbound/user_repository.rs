use crate::modules::users::core::user::User;
use crate::shared::infrastructure::database::{TransactionError, TransactionManager};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

#[derive(Debug, Error)]
pub enum UserRepositoryError {
    #[error("user store unavailable: {0}")]
    Unavailable(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl From<TransactionError> for UserRepositoryError {
    fn from(error: TransactionError) -> Self {
        match error {
            TransactionError::Unavailable(message) => UserRepositoryError::Unavailable(message),
            TransactionError::Backend(message) => UserRepositoryError::Backend(message),
        }
    }
}

/// Users live in the same transactional database as the outbox, so an insert
/// and its outbox append share one transaction.
#[async_trait]
pub trait UserRepository: TransactionManager {
    /// Inserts unless a user with the same email exists. Emails are unique.
    async fn insert_if_absent(
        &self,
        tx: &mut Self::Tx,
        user: &User,
    ) -> Result<InsertOutcome, UserRepositoryError>;

    async fn find_by_email(
        &self,
        tx: &mut Self::Tx,
        email: &str,
    ) -> Result<Option<User>, UserRepositoryError>;
}
