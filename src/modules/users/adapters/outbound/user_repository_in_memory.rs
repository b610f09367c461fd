use crate::modules::users::adapters::outbound::user_repository::{
    InsertOutcome, UserRepository, UserRepositoryError,
};
use crate::modules::users::core::user::User;
use crate::shared::infrastructure::database::in_memory::{InMemoryDatabase, InMemoryTransaction};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Business table of the in-memory database, keyed by email.
#[derive(Debug, Clone, Default)]
pub struct UserTable {
    by_email: BTreeMap<String, User>,
}

pub type InMemoryUserDatabase = InMemoryDatabase<UserTable>;

#[async_trait]
impl UserRepository for InMemoryDatabase<UserTable> {
    async fn insert_if_absent(
        &self,
        tx: &mut InMemoryTransaction<UserTable>,
        user: &User,
    ) -> Result<InsertOutcome, UserRepositoryError> {
        let users = &mut tx.tables_mut().business.by_email;
        if users.contains_key(&user.email) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        users.insert(user.email.clone(), user.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn find_by_email(
        &self,
        tx: &mut InMemoryTransaction<UserTable>,
        email: &str,
    ) -> Result<Option<User>, UserRepositoryError> {
        Ok(tx.tables().business.by_email.get(email).cloned())
    }
}
