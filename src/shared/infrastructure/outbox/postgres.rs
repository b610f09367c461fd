use crate::shared::core::primitives::OutboxId;
use crate::shared::infrastructure::database::TransactionManager;
use crate::shared::infrastructure::database::postgres::PostgresDatabase;
use crate::shared::infrastructure::outbox::{
    NewOutboxRecord, OutboxError, OutboxRecord, OutboxStore,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};
use std::collections::BTreeSet;
use std::time::Duration;

const RECORD_COLUMNS: &str =
    "id, event_type, occurred_at, environment, payload, processed, claimed_by, claimed_until";

#[derive(Debug, sqlx::FromRow)]
struct OutboxRow {
    id: i64,
    event_type: String,
    occurred_at: DateTime<Utc>,
    environment: String,
    payload: String,
    processed: bool,
    claimed_by: Option<String>,
    claimed_until: Option<DateTime<Utc>>,
}

impl From<OutboxRow> for OutboxRecord {
    fn from(row: OutboxRow) -> Self {
        Self {
            id: row.id,
            event_type: row.event_type,
            occurred_at: row.occurred_at,
            environment: row.environment,
            payload: row.payload,
            processed: row.processed,
            claimed_by: row.claimed_by,
            claimed_until: row.claimed_until,
        }
    }
}

fn map_sqlx(error: sqlx::Error) -> OutboxError {
    match error {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            OutboxError::Transient(error.to_string())
        }
        other => OutboxError::Backend(other.to_string()),
    }
}

fn to_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait]
impl OutboxStore for PostgresDatabase {
    async fn append(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        records: Vec<NewOutboxRecord>,
    ) -> Result<Vec<OutboxId>, OutboxError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        for record in &records {
            record.validate()?;
        }

        let mut event_types = Vec::with_capacity(records.len());
        let mut occurred_ats = Vec::with_capacity(records.len());
        let mut environments = Vec::with_capacity(records.len());
        let mut payloads = Vec::with_capacity(records.len());
        for record in records {
            event_types.push(record.event_type);
            occurred_ats.push(record.occurred_at);
            environments.push(record.environment);
            payloads.push(record.payload);
        }

        // UNNEST keeps input order and BIGSERIAL hands out ids in row order.
        let mut ids: Vec<OutboxId> = sqlx::query_scalar(
            r#"
            INSERT INTO event_outbox (event_type, occurred_at, environment, payload)
            SELECT * FROM UNNEST($1::text[], $2::timestamptz[], $3::text[], $4::text[])
            RETURNING id
            "#,
        )
        .bind(&event_types)
        .bind(&occurred_ats)
        .bind(&environments)
        .bind(&payloads)
        .fetch_all(&mut **tx)
        .await
        .map_err(map_sqlx)?;
        ids.sort_unstable();
        Ok(ids)
    }

    async fn claim_pending(
        &self,
        worker: &str,
        limit: usize,
        lease: Duration,
    ) -> Result<Vec<OutboxRecord>, OutboxError> {
        let mut tx = self.begin().await?;
        let sql = format!(
            r#"
            UPDATE event_outbox
               SET claimed_by = $1,
                   claimed_until = now() + make_interval(secs => $2)
             WHERE id IN (
                   SELECT id FROM event_outbox
                    WHERE processed = FALSE
                      AND (claimed_until IS NULL OR claimed_until <= now())
                    ORDER BY id
                    LIMIT $3
                    FOR UPDATE SKIP LOCKED)
            RETURNING {RECORD_COLUMNS}
            "#
        );
        let rows: Vec<OutboxRow> = sqlx::query_as(&sql)
            .bind(worker)
            .bind(lease.as_secs_f64())
            .bind(to_limit(limit))
            .fetch_all(&mut *tx)
            .await
            .map_err(map_sqlx)?;
        self.commit(tx).await?;

        let mut records: Vec<OutboxRecord> = rows.into_iter().map(OutboxRecord::from).collect();
        records.sort_by_key(|record| record.id);
        Ok(records)
    }

    async fn mark_processed(&self, ids: &[OutboxId]) -> Result<u64, OutboxError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let ids: Vec<OutboxId> = ids
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let mut tx = self.begin().await?;

        let updated: Vec<OutboxId> = sqlx::query_scalar(
            r#"
            UPDATE event_outbox
               SET processed = TRUE, claimed_by = NULL, claimed_until = NULL
             WHERE id = ANY($1)
            RETURNING id
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        if updated.len() != ids.len() {
            let updated: BTreeSet<OutboxId> = updated.into_iter().collect();
            let unknown = ids.into_iter().filter(|id| !updated.contains(id)).collect();
            self.rollback(tx).await?;
            return Err(OutboxError::UnknownRecords(unknown));
        }

        self.commit(tx).await?;
        Ok(ids.len() as u64)
    }

    async fn release(&self, worker: &str, ids: &[OutboxId]) -> Result<u64, OutboxError> {
        let result = sqlx::query(
            r#"
            UPDATE event_outbox
               SET claimed_by = NULL, claimed_until = NULL
             WHERE id = ANY($1) AND claimed_by = $2 AND processed = FALSE
            "#,
        )
        .bind(ids)
        .bind(worker)
        .execute(self.pool())
        .await
        .map_err(map_sqlx)?;
        Ok(result.rows_affected())
    }

    async fn find_by_ids(&self, ids: &[OutboxId]) -> Result<Vec<OutboxRecord>, OutboxError> {
        let sql =
            format!("SELECT {RECORD_COLUMNS} FROM event_outbox WHERE id = ANY($1) ORDER BY id");
        let rows: Vec<OutboxRow> = sqlx::query_as(&sql)
            .bind(ids)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx)?;
        Ok(rows.into_iter().map(OutboxRecord::from).collect())
    }

    async fn list_pending(&self, limit: usize) -> Result<Vec<OutboxRecord>, OutboxError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM event_outbox WHERE processed = FALSE ORDER BY id LIMIT $1"
        );
        let rows: Vec<OutboxRow> = sqlx::query_as(&sql)
            .bind(to_limit(limit))
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx)?;
        Ok(rows.into_iter().map(OutboxRecord::from).collect())
    }
}
