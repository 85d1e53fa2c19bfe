use std::net::SocketAddr;
use std::time::Instant;

use crate::engine::EngineError;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total operations handled. Labels: operation, status.
pub const REQUESTS_TOTAL: &str = "tablebook_requests_total";

/// Histogram: operation latency in seconds. Labels: operation.
pub const REQUEST_DURATION_SECONDS: &str = "tablebook_request_duration_seconds";

/// Counter: rejected operations. Labels: operation, reason.
pub const REJECTIONS_TOTAL: &str = "tablebook_rejections_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: tables currently in the store.
pub const TABLES_ACTIVE: &str = "tablebook_tables_active";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "tablebook_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "tablebook_wal_flush_batch_size";

/// Counter: WAL compactions run. Labels: status.
pub const WAL_COMPACTIONS_TOTAL: &str = "tablebook_wal_compactions_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Record the outcome of one operation.
pub fn record<T>(operation: &'static str, started: Instant, result: &Result<T, EngineError>) {
    let status = match result {
        Ok(_) => "ok",
        Err(e) => e.kind().as_str(),
    };
    metrics::counter!(REQUESTS_TOTAL, "operation" => operation, "status" => status).increment(1);
    metrics::histogram!(REQUEST_DURATION_SECONDS, "operation" => operation)
        .record(started.elapsed().as_secs_f64());
    if let Err(e) = result {
        metrics::counter!(REJECTIONS_TOTAL, "operation" => operation, "reason" => e.reason())
            .increment(1);
    }
}
