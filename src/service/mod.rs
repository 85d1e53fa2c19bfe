//! Request-facing operations. Services keep no state of their own: every call
//! re-reads the store, and final writes run on a detached task so a caller
//! that gives up mid-request cannot leave a write half applied.

mod reservations;
mod tables;

pub use reservations::ReservationService;
pub use tables::TableService;

use std::future::Future;

use crate::engine::EngineError;

/// Run a store write to completion regardless of whether the caller is
/// still waiting for it.
async fn run_detached<T, F>(write: F) -> Result<T, EngineError>
where
    F: Future<Output = Result<T, EngineError>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(write)
        .await
        .map_err(|e| EngineError::TaskFailed(e.to_string()))?
}
