use crate::modules::users::adapters::outbound::user_repository_in_memory::InMemoryUserDatabase;
use crate::modules::users::core::events::{UserCreated, UserEvent};
use crate::modules::users::use_cases::create_user::handler::CreateUserHandler;
use crate::shared::application::event_publisher::EventPublisher;
use crate::shared::application::outbox_drainer::{DrainError, DrainerConfig, OutboxDrainer};
use crate::shared::application::use_case::UseCaseExecutor;
use crate::shared::core::outbox_event::OutboxEvent;
use crate::shared::core::primitives::Environment;
use crate::shared::infrastructure::database::TransactionManager;
use crate::shared::infrastructure::event_log::in_memory::InMemoryEventLog;
use crate::shared::infrastructure::outbox::OutboxStore;
use crate::tests::fixtures::commands::create_user::CreateUserBuilder;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn user_created(n: usize) -> UserEvent {
    UserEvent::UserCreated(UserCreated {
        email: format!("user-{n}@example.com"),
        first_name: "Teddy".to_string(),
        last_name: format!("Test {n}"),
    })
}

async fn seed_outbox(database: &Arc<InMemoryUserDatabase>, count: usize) {
    let publisher = EventPublisher::new(database.clone(), Environment::default());
    let events: Vec<UserEvent> = (0..count).map(user_created).collect();
    let mut tx = database.begin().await.unwrap();
    publisher.publish(&mut tx, &events).await.unwrap();
    database.commit(tx).await.unwrap();
}

fn drainer(
    database: &Arc<InMemoryUserDatabase>,
    sink: &Arc<InMemoryEventLog>,
    config: DrainerConfig,
) -> OutboxDrainer<InMemoryUserDatabase, InMemoryEventLog> {
    OutboxDrainer::new(database.clone(), sink.clone(), config)
}

#[tokio::test]
async fn creating_a_user_appends_one_pending_user_created_record() {
    let database = Arc::new(InMemoryUserDatabase::new());
    let publisher = EventPublisher::new(database.clone(), Environment::new("Local"));
    let handler = CreateUserHandler::new(database.clone(), publisher);
    let executor = UseCaseExecutor::new(database.clone());
    let command = CreateUserBuilder::new().build();

    executor.execute(&handler, command.clone()).await.unwrap();

    let records = database.outbox_records().await.unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.event_type, "UserCreated");
    assert_eq!(record.environment, "Local");
    assert!(!record.processed);

    let expected = UserEvent::UserCreated(UserCreated {
        email: command.email,
        first_name: command.first_name,
        last_name: command.last_name,
    })
    .to_payload()
    .unwrap();
    assert_eq!(record.payload, expected);
}

#[tokio::test]
async fn a_drained_record_is_processed_and_delivered_once() {
    let database = Arc::new(InMemoryUserDatabase::new());
    let publisher = EventPublisher::new(database.clone(), Environment::default());
    let handler = CreateUserHandler::new(database.clone(), publisher);
    let executor = UseCaseExecutor::new(database.clone());
    executor
        .execute(&handler, CreateUserBuilder::new().build())
        .await
        .unwrap();
    let payload = database.outbox_records().await.unwrap()[0].payload.clone();

    let sink = Arc::new(InMemoryEventLog::new());
    let drainer = drainer(&database, &sink, DrainerConfig::default());

    assert_eq!(drainer.drain().await.unwrap(), 1);
    assert_eq!(drainer.drain().await.unwrap(), 0);

    let records = database.outbox_records().await.unwrap();
    assert!(records[0].processed);
    let rows = sink.rows().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].payload, payload);
    assert_eq!(rows[0].event_type, "UserCreated");
}

#[tokio::test]
async fn a_single_batch_run_leaves_the_rest_pending() {
    let database = Arc::new(InMemoryUserDatabase::new());
    seed_outbox(&database, 250).await;
    let sink = Arc::new(InMemoryEventLog::new());
    let drainer = drainer(
        &database,
        &sink,
        DrainerConfig {
            max_batches_per_run: 1,
            ..DrainerConfig::default()
        },
    );

    assert_eq!(drainer.drain().await.unwrap(), 100);
    assert_eq!(database.list_pending(1000).await.unwrap().len(), 150);

    let pending = database.list_pending(1).await.unwrap();
    assert_eq!(pending[0].id, 101);
}

#[tokio::test]
async fn a_default_run_delivers_the_whole_backlog() {
    let database = Arc::new(InMemoryUserDatabase::new());
    seed_outbox(&database, 250).await;
    let sink = Arc::new(InMemoryEventLog::new());
    let drainer = drainer(&database, &sink, DrainerConfig::default());

    assert_eq!(drainer.drain().await.unwrap(), 250);
    assert!(database.list_pending(1000).await.unwrap().is_empty());

    let sizes: Vec<usize> = sink.batches().await.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![100, 100, 50]);
}

#[tokio::test]
async fn a_failing_second_batch_keeps_the_first_one_processed() {
    let database = Arc::new(InMemoryUserDatabase::new());
    seed_outbox(&database, 250).await;
    let mut sink = InMemoryEventLog::new();
    sink.fail_on_call(2);
    let sink = Arc::new(sink);
    let drainer = drainer(&database, &sink, DrainerConfig::default());

    let result = drainer.drain().await;
    assert!(matches!(result, Err(DrainError::Sink { delivered: 100, .. })));

    let records = database.outbox_records().await.unwrap();
    assert!(records[..100].iter().all(|r| r.processed));
    assert!(records[100..].iter().all(|r| !r.processed));
    assert!(records.iter().all(|r| r.claimed_by.is_none()));
}

#[tokio::test]
async fn a_failed_batch_is_delivered_by_a_later_run() {
    let database = Arc::new(InMemoryUserDatabase::new());
    seed_outbox(&database, 30).await;
    let mut sink = InMemoryEventLog::new();
    sink.fail_on_call(1);
    let sink = Arc::new(sink);
    let drainer = drainer(&database, &sink, DrainerConfig::default());

    assert!(drainer.drain().await.is_err());
    assert_eq!(drainer.drain().await.unwrap(), 30);

    assert!(database.list_pending(100).await.unwrap().is_empty());
    assert_eq!(sink.rows().await.len(), 30);
}

#[tokio::test]
async fn processed_records_are_never_sent_again() {
    let database = Arc::new(InMemoryUserDatabase::new());
    seed_outbox(&database, 5).await;
    let sink = Arc::new(InMemoryEventLog::new());
    let drainer = drainer(&database, &sink, DrainerConfig::default());

    drainer.drain().await.unwrap();
    let ids: Vec<_> = database
        .outbox_records()
        .await
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(database.mark_processed(&ids).await.unwrap(), 5);
    drainer.drain().await.unwrap();

    assert!(
        database
            .find_by_ids(&ids)
            .await
            .unwrap()
            .iter()
            .all(|r| r.processed)
    );
    assert_eq!(sink.calls().await, 1);
}

#[tokio::test]
async fn concurrent_drainers_never_send_a_record_twice() {
    let database = Arc::new(InMemoryUserDatabase::new());
    seed_outbox(&database, 300).await;
    let mut sink = InMemoryEventLog::new();
    sink.set_delay(Duration::from_millis(10));
    let sink = Arc::new(sink);
    let config = DrainerConfig {
        batch_size: 25,
        ..DrainerConfig::default()
    };
    let first = drainer(&database, &sink, config).with_worker_id("worker-a");
    let second = drainer(&database, &sink, config).with_worker_id("worker-b");

    let (a, b) = tokio::join!(first.drain(), second.drain());
    let delivered = a.unwrap() + b.unwrap();
    assert_eq!(delivered, 300);

    let rows = sink.rows().await;
    assert_eq!(rows.len(), 300);
    let unique: HashSet<&str> = rows.iter().map(|r| r.payload.as_str()).collect();
    assert_eq!(unique.len(), 300);
    assert!(database.list_pending(1000).await.unwrap().is_empty());
}

#[tokio::test]
async fn records_claimed_by_a_crashed_worker_are_recovered_after_the_lease() {
    let database = Arc::new(InMemoryUserDatabase::new());
    seed_outbox(&database, 3).await;

    // A worker that claims and then disappears.
    let abandoned = database
        .claim_pending("crashed-worker", 100, Duration::from_millis(50))
        .await
        .unwrap();
    assert_eq!(abandoned.len(), 3);

    let sink = Arc::new(InMemoryEventLog::new());
    let drainer = drainer(&database, &sink, DrainerConfig::default());
    assert_eq!(drainer.drain().await.unwrap(), 0);

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(drainer.drain().await.unwrap(), 3);
    assert!(database.list_pending(10).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn a_slow_event_log_leaves_the_batch_pending() {
    let database = Arc::new(InMemoryUserDatabase::new());
    seed_outbox(&database, 2).await;
    let mut sink = InMemoryEventLog::new();
    sink.set_delay(Duration::from_secs(30));
    let sink = Arc::new(sink);
    let drainer = drainer(&database, &sink, DrainerConfig::default());

    let result = drainer.drain().await;
    assert!(matches!(result, Err(DrainError::SinkTimeout { delivered: 0, .. })));
    assert_eq!(database.list_pending(10).await.unwrap().len(), 2);
}
