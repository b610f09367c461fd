use crate::shared::application::outbox_drainer::OutboxDrainer;
use crate::shared::infrastructure::event_log::EventLogSink;
use crate::shared::infrastructure::outbox::OutboxStore;
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Drains the outbox on every tick until `shutdown` resolves. Drain errors are
/// logged and retried on the next tick. Returns the number of ticks run.
pub async fn run_drainer<TStore, TSink, TShutdown>(
    drainer: OutboxDrainer<TStore, TSink>,
    every: Duration,
    shutdown: TShutdown,
) -> u64
where
    TStore: OutboxStore + 'static,
    TSink: EventLogSink + 'static,
    TShutdown: Future<Output = ()>,
{
    tracing::info!(worker = %drainer.worker_id(), every = ?every, "starting outbox drainer");

    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut tick_count: u64 = 0;
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!(tick_count, "stopping outbox drainer");
                return tick_count;
            }
            _ = interval.tick() => {}
        }
        tick_count += 1;

        match drainer.drain().await {
            Ok(delivered) if delivered > 0 => {
                tracing::info!(tick_count, delivered, "drained outbox");
            }
            Ok(_) => {
                if tick_count <= 3 || tick_count % 60 == 0 {
                    tracing::info!(tick_count, "outbox empty");
                }
            }
            Err(error) => {
                tracing::error!(
                    tick_count,
                    delivered = error.delivered(),
                    error = %error,
                    "drain failed"
                );
            }
        }
    }
}
