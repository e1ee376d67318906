//! Node lifecycle: open the service, run its background tasks, shut down.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::config::OracleNodeConfig;
use crate::scheduler;
use crate::service::OracleService;
use crate::shutdown::ShutdownController;
use crate::NodeError;

/// How long `stop` waits for each background task before giving up on it.
const TASK_JOIN_TIMEOUT: Duration = Duration::from_secs(10);

pub struct OracleNode {
    service: Arc<OracleService>,
    shutdown: ShutdownController,
    task_handles: Vec<JoinHandle<()>>,
}

impl OracleNode {
    pub fn new(config: OracleNodeConfig) -> Result<Self, NodeError> {
        Ok(Self::from_service(OracleService::open(config)?))
    }

    pub fn from_service(service: OracleService) -> Self {
        Self {
            service: Arc::new(service),
            shutdown: ShutdownController::new(),
            task_handles: Vec::new(),
        }
    }

    pub fn service(&self) -> &Arc<OracleService> {
        &self.service
    }

    pub fn shutdown_controller(&self) -> &ShutdownController {
        &self.shutdown
    }

    /// Spawn the timeout scan and snapshot loops.
    pub fn start(&mut self) -> Result<(), NodeError> {
        if !self.task_handles.is_empty() {
            return Err(NodeError::Task("node already started".into()));
        }
        let config = self.service.config();
        let scan_period = Duration::from_secs(config.timeout_scan_interval_secs);
        let snapshot_period = Duration::from_secs(config.snapshot_interval_secs);
        tracing::info!(
            data_dir = %config.data_dir.display(),
            timeout_scan_secs = config.timeout_scan_interval_secs,
            snapshot_secs = config.snapshot_interval_secs,
            validators = self.service.oracle().validators().len(),
            "oracle node starting"
        );

        self.task_handles.push(scheduler::spawn_timeout_scan(
            Arc::clone(&self.service),
            scan_period,
            self.shutdown.subscribe(),
        ));
        self.task_handles.push(scheduler::spawn_snapshots(
            Arc::clone(&self.service),
            snapshot_period,
            self.shutdown.subscribe(),
        ));
        Ok(())
    }

    /// Block until SIGINT/SIGTERM, then stop.
    pub async fn run_until_shutdown(&mut self) -> Result<(), NodeError> {
        self.start()?;
        self.shutdown.wait_for_signal().await;
        self.stop().await
    }

    /// Signal every task, wait for them, then write a final snapshot.
    pub async fn stop(&mut self) -> Result<(), NodeError> {
        tracing::info!("oracle node stopping");
        self.shutdown.shutdown();

        for handle in self.task_handles.drain(..) {
            match tokio::time::timeout(TASK_JOIN_TIMEOUT, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "background task failed"),
                Err(_) => tracing::warn!("background task did not stop in time"),
            }
        }

        self.service.process_events();
        let service = Arc::clone(&self.service);
        tokio::task::spawn_blocking(move || service.save_snapshot())
            .await
            .map_err(|e| NodeError::Task(e.to_string()))??;
        tracing::info!("oracle node stopped, final snapshot written");
        Ok(())
    }
}
