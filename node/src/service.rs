//! The oracle engine wired to its node-side collaborators.
//!
//! [`OracleService`] owns the engine, the built-in token ledger, the snapshot
//! store and the metrics registry. It has no async parts; the background
//! loops in [`crate::scheduler`] call into it.

use std::sync::Arc;

use oracle_ledger::{InMemoryLedger, TokenLedger};
use oracle_sectors::SectorConfigStore;
use oracle_types::{Address, Clock, SystemClock, ValidationId};
use oracle_validation::{OracleEvent, QualityOracle};

use crate::config::OracleNodeConfig;
use crate::metrics::OracleMetrics;
use crate::persistence::{PersistedState, SnapshotStore};
use crate::NodeError;

pub struct OracleService {
    config: OracleNodeConfig,
    oracle: Arc<QualityOracle>,
    ledger: Arc<InMemoryLedger>,
    store: SnapshotStore,
    metrics: OracleMetrics,
}

impl OracleService {
    /// Open the service on the system clock.
    pub fn open(config: OracleNodeConfig) -> Result<Self, NodeError> {
        Self::open_with_clock(config, Arc::new(SystemClock))
    }

    /// Restore from `<data_dir>/oracle.snapshot` if present, otherwise start
    /// fresh from the sectors and accounts seeded in `config`.
    pub fn open_with_clock(
        config: OracleNodeConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, NodeError> {
        config.validate()?;
        std::fs::create_dir_all(&config.data_dir)?;
        let settings = config.oracle_settings()?;
        let store = SnapshotStore::new(config.snapshot_path());

        let (oracle, ledger) = match store.load()? {
            Some(state) => {
                let ledger = Arc::new(InMemoryLedger::restore(state.ledger.unwrap_or_default()));
                let oracle = QualityOracle::restore(
                    state.oracle,
                    settings,
                    Arc::clone(&ledger) as Arc<dyn TokenLedger>,
                    clock,
                )?;
                if !config.sectors.is_empty() || !config.accounts.is_empty() {
                    tracing::debug!("snapshot present, config seeds ignored");
                }
                (oracle, ledger)
            }
            None => {
                let ledger = Arc::new(InMemoryLedger::new());
                for account in &config.accounts {
                    ledger.fund(&Address::new(account.address.as_str()), account.balance as u128);
                }
                let oracle = QualityOracle::new(
                    settings,
                    Arc::new(SectorConfigStore::new()),
                    Arc::clone(&ledger) as Arc<dyn TokenLedger>,
                    clock,
                )?;
                for sector in &config.sectors {
                    oracle.upsert_sector(sector.policy())?;
                    for entity_config in sector.entity_type_configs() {
                        oracle.upsert_entity_type_config(entity_config)?;
                    }
                }
                tracing::info!(
                    sectors = config.sectors.len(),
                    accounts = config.accounts.len(),
                    "fresh oracle seeded from config"
                );
                (oracle, ledger)
            }
        };

        let service = Self {
            config,
            oracle: Arc::new(oracle),
            ledger,
            store,
            metrics: OracleMetrics::new()?,
        };
        service.process_events();
        Ok(service)
    }

    pub fn config(&self) -> &OracleNodeConfig {
        &self.config
    }

    pub fn oracle(&self) -> &Arc<QualityOracle> {
        &self.oracle
    }

    pub fn ledger(&self) -> &Arc<InMemoryLedger> {
        &self.ledger
    }

    pub fn metrics(&self) -> &OracleMetrics {
        &self.metrics
    }

    /// Run one timeout scan and account for what it produced.
    pub fn tick_timeouts(&self) -> Vec<ValidationId> {
        let timed_out = self.oracle.check_timeouts();
        self.process_events();
        timed_out
    }

    /// Drain engine events into logs and metrics. Returns how many were drained.
    pub fn process_events(&self) -> usize {
        let events = self.oracle.drain_events();
        for event in &events {
            match event {
                OracleEvent::SettlementFailed { validation, error } => {
                    tracing::error!(validation = %validation, error = %error, "settlement needs operator attention");
                }
                OracleEvent::DisputeResolved {
                    dispute,
                    resolution,
                    outcome,
                    ..
                } => {
                    tracing::info!(dispute = %dispute, resolution = ?resolution, outcome = ?outcome, "dispute closed");
                }
                _ => tracing::trace!(event = ?event, "oracle event"),
            }
        }
        self.metrics.observe(&events);
        let pending = self
            .oracle
            .validations()
            .iter()
            .filter(|v| v.status.is_pending())
            .count();
        self.metrics.set_pending(pending as u64);
        events.len()
    }

    /// Write the engine and ledger state to disk.
    ///
    /// Both are captured while engine commands are held off, so the ledger
    /// never holds a move the engine snapshot has not seen.
    pub fn save_snapshot(&self) -> Result<(), NodeError> {
        let (oracle, ledger) = self.oracle.snapshot_with(|| self.ledger.snapshot());
        self.store.save(&PersistedState::new(oracle, Some(ledger)))
    }
}
