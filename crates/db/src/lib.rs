pub mod config;
pub mod court;
pub mod event;
pub mod group;
pub mod password_reset;
pub mod role;
/// Database schema
pub mod schema;
pub mod social;
pub mod user;

use diesel::connection::{Instrumentation, InstrumentationEvent};
use rocket_sync_db_pools::database;

/// A pooled SQLite connection. The pool applies `foreign_keys = ON`, WAL
/// journaling and a busy timeout to every connection it hands out.
#[database("database")]
pub struct DbConn(diesel::SqliteConnection);

struct QueryTracer;

impl Instrumentation for QueryTracer {
    fn on_connection_event(&mut self, event: InstrumentationEvent<'_>) {
        match event {
            InstrumentationEvent::StartQuery { query, .. } => {
                tracing::trace!("Started running query {query}");
            }
            InstrumentationEvent::FinishQuery {
                query,
                error: Some(error),
                ..
            } => {
                tracing::warn!(
                    "Encountered an error when running query {query} (error: {error})"
                );
            }
            _ => (),
        }
    }
}

fn query_tracer() -> Option<Box<dyn Instrumentation>> {
    Some(Box::new(QueryTracer))
}

/// Attaches query tracing to every connection established after this call.
pub fn install_query_tracing() {
    if let Err(e) = diesel::connection::set_default_instrumentation(query_tracer)
    {
        tracing::warn!("Could not install query instrumentation: {e}");
    }
}
