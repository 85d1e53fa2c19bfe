use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::engine::{Engine, EngineError};

/// Compact the WAL if at least `threshold` events were appended since the
/// last compaction. Returns whether a compaction ran.
pub async fn compact_if_due(engine: &Engine, threshold: u64) -> Result<bool, EngineError> {
    let appended = engine.wal_appends_since_compact().await;
    if appended < threshold {
        debug!(appended, threshold, "compaction not due");
        return Ok(false);
    }
    let result = engine.compact_wal().await;
    let status = if result.is_ok() { "ok" } else { "error" };
    metrics::counter!(crate::observability::WAL_COMPACTIONS_TOTAL, "status" => status).increment(1);
    result?;
    info!(appended, "WAL compacted");
    Ok(true)
}

/// Background task that periodically checks whether the WAL needs compacting.
pub async fn run_compactor(engine: Arc<Engine>, threshold: u64, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        if let Err(e) = compact_if_due(&engine, threshold).await {
            tracing::error!(error = %e, "WAL compaction failed");
        }
    }
}
