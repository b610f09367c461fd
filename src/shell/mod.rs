// Composition root for the outbox drainer process.
//
// Responsibilities:
// - Read config from environment.
// - Instantiate the Postgres outbox store and the ClickHouse event log.
// - Run the drainer worker until shutdown.

pub mod config;
pub mod workers;
