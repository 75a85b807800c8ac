use std::sync::Arc;

use tracing::info;

use bunkhouse::config::Config;
use bunkhouse::engine::Engine;
use bunkhouse::reconciler;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    bunkhouse::observability::init(config.metrics_port)?;

    // Ensure data directory exists
    std::fs::create_dir_all(&config.data_dir)?;

    let wal_path = config.wal_path();
    let engine = Arc::new(Engine::open(&wal_path)?);
    info!("bunkhouse started");
    info!("  journal: {}", wal_path.display());
    info!("  rooms: {}", engine.room_count());
    info!("  compact_threshold: {}", config.compact_threshold);
    info!("  reconcile_interval: {}s", config.reconcile_interval.as_secs());
    info!(
        "  metrics: {}",
        config
            .metrics_port
            .map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    let repaired = engine.reconcile_counters().await?;
    if !repaired.is_empty() {
        info!("startup reconciliation repaired {} room counters", repaired.len());
    }

    let reconciler_task = tokio::spawn(reconciler::run_reconciler(
        engine.clone(),
        config.reconcile_interval,
    ));
    let compactor_task = tokio::spawn(reconciler::run_compactor(
        engine.clone(),
        config.compact_threshold,
    ));

    // Run until SIGTERM/ctrl-c
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
    info!("shutdown signal received");

    reconciler_task.abort();
    compactor_task.abort();
    if let Err(e) = engine.compact_journal().await {
        tracing::warn!("final compaction failed: {e}");
    }

    info!("bunkhouse stopped");
    Ok(())
}
