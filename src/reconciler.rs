use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::engine::Engine;

/// Background task that periodically brings room counters back in line with
/// their booking ledgers.
pub async fn run_reconciler(engine: Arc<Engine>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    // The first tick fires immediately; startup already reconciled.
    interval.tick().await;
    loop {
        interval.tick().await;
        match engine.reconcile_counters().await {
            Ok(repaired) if repaired.is_empty() => debug!("reconciler: counters consistent"),
            Ok(repaired) => info!("reconciler: repaired {} room counters", repaired.len()),
            Err(e) => warn!("reconciler pass failed: {e}"),
        }
    }
}

/// Background task that rewrites the journal once enough records pile up.
pub async fn run_compactor(engine: Arc<Engine>, threshold: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(30));
    loop {
        interval.tick().await;
        compact_if_due(&engine, threshold).await;
    }
}

/// Compact when the journal has grown past `threshold` records. Returns
/// whether a compaction ran and succeeded.
pub async fn compact_if_due(engine: &Engine, threshold: u64) -> bool {
    let appends = engine.journal_appends_since_compact().await;
    if appends < threshold {
        return false;
    }
    match engine.compact_journal().await {
        Ok(()) => {
            info!("compacted journal after {appends} appends");
            true
        }
        Err(e) => {
            warn!("journal compaction failed: {e}");
            false
        }
    }
}
