use crate::shared::infrastructure::event_log::{EventLogError, EventLogRow, EventLogSink};
use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::Mutex;

/// Recording sink. Each accepted `insert` call is kept as one batch.
#[derive(Default)]
pub struct InMemoryEventLog {
    batches: Mutex<Vec<Vec<EventLogRow>>>,
    calls: Mutex<usize>,
    failing_calls: HashSet<usize>,
    delay: Option<Duration>,
    is_offline: bool,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects the n-th `insert` call, counted from 1.
    pub fn fail_on_call(&mut self, call: usize) {
        self.failing_calls.insert(call);
    }

    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = Some(delay);
    }

    pub fn toggle_offline(&mut self) {
        self.is_offline = !self.is_offline;
    }

    pub async fn batches(&self) -> Vec<Vec<EventLogRow>> {
        self.batches.lock().await.clone()
    }

    pub async fn rows(&self) -> Vec<EventLogRow> {
        self.batches.lock().await.iter().flatten().cloned().collect()
    }

    pub async fn calls(&self) -> usize {
        *self.calls.lock().await
    }
}

#[async_trait]
impl EventLogSink for InMemoryEventLog {
    async fn insert(&self, rows: &[EventLogRow]) -> Result<(), EventLogError> {
        let call = {
            let mut calls = self.calls.lock().await;
            *calls += 1;
            *calls
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.is_offline {
            return Err(EventLogError::Unavailable("Event log offline".into()));
        }
        if self.failing_calls.contains(&call) {
            return Err(EventLogError::Rejected {
                status: 500,
                body: format!("insert call {call} rejected"),
            });
        }
        self.batches.lock().await.push(rows.to_vec());
        Ok(())
    }
}
