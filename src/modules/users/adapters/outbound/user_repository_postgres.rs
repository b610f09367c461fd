use crate::modules::users::adapters::outbound::user_repository::{
    InsertOutcome, UserRepository, UserRepositoryError,
};
use crate::modules::users::core::user::User;
use crate::shared::infrastructure::database::postgres::PostgresDatabase;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    first_name: String,
    last_name: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            created_at: row.created_at,
        }
    }
}

fn map_sqlx(error: sqlx::Error) -> UserRepositoryError {
    match error {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            UserRepositoryError::Unavailable(error.to_string())
        }
        other => UserRepositoryError::Backend(other.to_string()),
    }
}

#[async_trait]
impl UserRepository for PostgresDatabase {
    async fn insert_if_absent(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        user: &User,
    ) -> Result<InsertOutcome, UserRepositoryError> {
        // A concurrent insert of the same email blocks on the unique index
        // until the other transaction ends, then reports a conflict.
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, email, first_name, last_name, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.created_at)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            Ok(InsertOutcome::AlreadyExists)
        } else {
            Ok(InsertOutcome::Inserted)
        }
    }

    async fn find_by_email(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        email: &str,
    ) -> Result<Option<User>, UserRepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, email, first_name, last_name, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_sqlx)?;
        Ok(row.map(User::from))
    }
}
