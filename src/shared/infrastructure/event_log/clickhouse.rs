use crate::shared::infrastructure::event_log::{EventLogError, EventLogRow, EventLogSink};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

#[derive(Serialize)]
struct ClickHouseRow<'a> {
    event_type: &'a str,
    event_date_time: String,
    environment: &'a str,
    event_context: &'a str,
}

/// ClickHouse `event_log` table reached over the HTTP interface.
#[derive(Debug, Clone)]
pub struct ClickHouseEventLog {
    client: Client,
    url: String,
    table: String,
    user: Option<String>,
    password: Option<String>,
}

impl ClickHouseEventLog {
    pub fn new(url: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            table: table.into(),
            user: None,
            password: None,
        }
    }

    pub fn with_credentials(mut self, user: Option<String>, password: Option<String>) -> Self {
        self.user = user;
        self.password = password;
        self
    }

    fn insert_query(&self) -> String {
        format!(
            "INSERT INTO {} (event_type, event_date_time, environment, event_context) \
             FORMAT JSONEachRow",
            self.table
        )
    }
}

/// One JSON object per line, payload passed through untouched as
/// `event_context`.
pub fn render_body(rows: &[EventLogRow]) -> Result<String, EventLogError> {
    let mut body = String::new();
    for row in rows {
        let line = serde_json::to_string(&ClickHouseRow {
            event_type: &row.event_type,
            event_date_time: row.occurred_at.format(DATE_TIME_FORMAT).to_string(),
            environment: &row.environment,
            event_context: &row.payload,
        })?;
        body.push_str(&line);
        body.push('\n');
    }
    Ok(body)
}

#[async_trait]
impl EventLogSink for ClickHouseEventLog {
    async fn insert(&self, rows: &[EventLogRow]) -> Result<(), EventLogError> {
        if rows.is_empty() {
            return Ok(());
        }
        let body = render_body(rows)?;

        let mut request = self
            .client
            .post(&self.url)
            .query(&[("query", self.insert_query())])
            .body(body);
        if let Some(user) = &self.user {
            request = request.header("X-ClickHouse-User", user);
        }
        if let Some(password) = &self.password {
            request = request.header("X-ClickHouse-Key", password);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EventLogError::Unavailable(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EventLogError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
