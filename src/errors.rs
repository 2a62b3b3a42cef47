use thiserror::Error;

/// Failures surfaced by the record store and the services built on it.
///
/// Nothing here is retried; every variant propagates to the route layer,
/// which renders a message or redirects. A read that matches zero records
/// is `Ok(vec![])`, not an error.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("record store read failed: {0}")]
    StoreRead(String),
    #[error("record store write failed: {0}")]
    StoreWrite(String),
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i64 },
    #[error("operation requires an authenticated user")]
    Unauthenticated,
}
