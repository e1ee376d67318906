//! Background loops driving the service.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::service::OracleService;

/// Periodically decide validations whose voting window has elapsed.
pub fn spawn_timeout_scan(
    service: Arc<OracleService>,
    period: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    tracing::info!("timeout scan task shutting down");
                    break;
                }
                _ = interval.tick() => {
                    let timed_out = service.tick_timeouts();
                    if !timed_out.is_empty() {
                        tracing::debug!(count = timed_out.len(), "timeout scan decided validations");
                    }
                }
            }
        }
    })
}

/// Periodically write the engine snapshot. A failed write is logged and
/// retried on the next tick.
pub fn spawn_snapshots(
    service: Arc<OracleService>,
    period: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await; // skip the immediate first tick
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    tracing::info!("snapshot task shutting down");
                    break;
                }
                _ = interval.tick() => {
                    let writer = Arc::clone(&service);
                    match tokio::task::spawn_blocking(move || writer.save_snapshot()).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => tracing::warn!(error = %e, "periodic snapshot failed"),
                        Err(e) => tracing::warn!(error = %e, "snapshot writer panicked"),
                    }
                }
            }
        }
    })
}
