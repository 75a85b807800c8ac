use std::future::Future;
use std::net::SocketAddr;
use std::time::Instant;

use crate::engine::EngineError;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: engine operations. Labels: op, outcome.
pub const OPERATIONS_TOTAL: &str = "bunkhouse_operations_total";

/// Histogram: operation latency in seconds. Labels: op.
pub const OPERATION_DURATION_SECONDS: &str = "bunkhouse_operation_duration_seconds";

/// Counter: booking attempts refused because the dates were taken.
pub const BOOKING_CONFLICTS_TOTAL: &str = "bunkhouse_booking_conflicts_total";

// ── State metrics ───────────────────────────────────────────────

/// Gauge: rooms held by the engine.
pub const ROOMS_TOTAL: &str = "bunkhouse_rooms_total";

/// Counter: availability counters found out of line with the ledger and repaired.
pub const COUNTER_DRIFT_TOTAL: &str = "bunkhouse_counter_drift_total";

/// Histogram: journal group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "bunkhouse_wal_flush_duration_seconds";

/// Histogram: journal group-commit batch size (records per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "bunkhouse_wal_flush_batch_size";

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

/// Run an engine operation, recording its outcome and latency.
pub async fn track<T>(
    op: &'static str,
    fut: impl Future<Output = Result<T, EngineError>>,
) -> Result<T, EngineError> {
    let started = Instant::now();
    let result = fut.await;
    let outcome = match &result {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    };
    metrics::counter!(OPERATIONS_TOTAL, "op" => op, "outcome" => outcome).increment(1);
    metrics::histogram!(OPERATION_DURATION_SECONDS, "op" => op)
        .record(started.elapsed().as_secs_f64());
    result
}
