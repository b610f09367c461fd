// Run against a local ClickHouse with an `event_log` table:
// EVENT_LOG_URL=http://localhost:8123 cargo nextest run -- --ignored integration

use crate::shared::infrastructure::event_log::clickhouse::ClickHouseEventLog;
use crate::shared::infrastructure::event_log::{EventLogError, EventLogRow, EventLogSink};
use chrono::Utc;

fn sink(table: &str) -> ClickHouseEventLog {
    let url =
        std::env::var("EVENT_LOG_URL").unwrap_or_else(|_| "http://localhost:8123".to_string());
    ClickHouseEventLog::new(url, table).with_credentials(
        std::env::var("EVENT_LOG_USER").ok(),
        std::env::var("EVENT_LOG_PASSWORD").ok(),
    )
}

fn rows() -> Vec<EventLogRow> {
    vec![EventLogRow {
        event_type: "UserCreated".into(),
        occurred_at: Utc::now(),
        environment: "Test".into(),
        payload: r#"{"email":"teddy@test.com","first_name":"Teddy","last_name":"Test"}"#.into(),
    }]
}

#[tokio::test]
#[ignore]
async fn integration_clickhouse_should_accept_the_batch() {
    let result = sink("default.event_log").insert(&rows()).await;
    assert!(result.is_ok());
}

#[tokio::test]
#[ignore]
async fn integration_clickhouse_should_reject_an_unknown_table() {
    let result = sink("default.missing_event_log").insert(&rows()).await;
    assert!(matches!(result, Err(EventLogError::Rejected { .. })));
}

#[tokio::test]
#[ignore]
async fn integration_clickhouse_should_report_an_unreachable_server() {
    let sink = ClickHouseEventLog::new("http://127.0.0.1:9", "default.event_log");
    let result = sink.insert(&rows()).await;
    assert!(matches!(result, Err(EventLogError::Unavailable(_))));
}
