//! Versioned sector configuration store with an intake gate.

use crate::config::EntityTypeConfig;
use crate::error::SectorError;
use crate::policy::SectorPolicy;
use oracle_types::{EntityType, SectorId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

type ConfigKey = (SectorId, EntityType);

#[derive(Default)]
struct StoreInner {
    sectors: BTreeMap<SectorId, SectorPolicy>,
    /// Every published version per key, oldest first. The last entry is live.
    history: HashMap<ConfigKey, Vec<Arc<EntityTypeConfig>>>,
    paused: BTreeSet<SectorId>,
    paused_globally: bool,
}

/// Holds sector policies and the versioned entity-type configs.
///
/// Internally synchronized; share it with `Arc` between the queue, the
/// registry and the admin surface.
#[derive(Default)]
pub struct SectorConfigStore {
    inner: RwLock<StoreInner>,
}

impl SectorConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Sectors ─────────────────────────────────────────────────────────

    /// Define or update a sector's policy.
    pub fn upsert_sector(&self, policy: SectorPolicy) -> Result<(), SectorError> {
        if policy.sector_id.as_str().is_empty() {
            return Err(SectorError::InvalidConfig("sector id must not be empty".into()));
        }
        tracing::info!(
            sector = %policy.sector_id,
            min_validator_stake = policy.min_validator_stake,
            "sector policy updated"
        );
        self.inner
            .write()
            .sectors
            .insert(policy.sector_id.clone(), policy);
        Ok(())
    }

    pub fn sector(&self, sector: &SectorId) -> Option<SectorPolicy> {
        self.inner.read().sectors.get(sector).cloned()
    }

    pub fn sectors(&self) -> Vec<SectorPolicy> {
        self.inner.read().sectors.values().cloned().collect()
    }

    /// Minimum validator stake for a sector.
    pub fn min_validator_stake(&self, sector: &SectorId) -> Result<u128, SectorError> {
        self.inner
            .read()
            .sectors
            .get(sector)
            .map(|p| p.min_validator_stake)
            .ok_or_else(|| SectorError::UnknownSector(sector.clone()))
    }

    // ── Entity-type configs ─────────────────────────────────────────────

    /// Validate and publish a new config version for `(sector, entity type)`.
    ///
    /// Returns the published snapshot with its assigned version.
    pub fn upsert_config(
        &self,
        mut cfg: EntityTypeConfig,
    ) -> Result<Arc<EntityTypeConfig>, SectorError> {
        cfg.validate()?;
        let mut inner = self.inner.write();
        if !inner.sectors.contains_key(&cfg.sector_id) {
            return Err(SectorError::UnknownSector(cfg.sector_id.clone()));
        }
        let versions = inner
            .history
            .entry((cfg.sector_id.clone(), cfg.entity_type))
            .or_default();
        cfg.version = versions.last().map_or(1, |v| v.version + 1);
        let published = Arc::new(cfg);
        versions.push(Arc::clone(&published));
        tracing::info!(
            sector = %published.sector_id,
            entity_type = %published.entity_type,
            version = published.version,
            quorum = published.quorum_size,
            active = published.active,
            "entity type config published"
        );
        Ok(published)
    }

    /// The live config for `(sector, entity type)`.
    pub fn get_config(
        &self,
        sector: &SectorId,
        entity_type: EntityType,
    ) -> Result<Arc<EntityTypeConfig>, SectorError> {
        self.inner
            .read()
            .history
            .get(&(sector.clone(), entity_type))
            .and_then(|versions| versions.last().cloned())
            .ok_or_else(|| SectorError::ConfigNotFound {
                sector: sector.clone(),
                entity_type,
            })
    }

    /// Every live config, ordered by sector then entity type.
    pub fn configs(&self) -> Vec<Arc<EntityTypeConfig>> {
        let inner = self.inner.read();
        let mut live: Vec<_> = inner
            .history
            .values()
            .filter_map(|versions| versions.last().cloned())
            .collect();
        live.sort_by(|a, b| {
            (&a.sector_id, a.entity_type).cmp(&(&b.sector_id, b.entity_type))
        });
        live
    }

    /// All published versions for a key, oldest first.
    pub fn history(&self, sector: &SectorId, entity_type: EntityType) -> Vec<Arc<EntityTypeConfig>> {
        self.inner
            .read()
            .history
            .get(&(sector.clone(), entity_type))
            .cloned()
            .unwrap_or_default()
    }

    // ── Intake gate ─────────────────────────────────────────────────────

    /// Stop accepting new submissions for a sector. In-flight validations
    /// are unaffected. Idempotent.
    pub fn pause_sector(&self, sector: &SectorId) -> Result<(), SectorError> {
        let mut inner = self.inner.write();
        if !inner.sectors.contains_key(sector) {
            return Err(SectorError::UnknownSector(sector.clone()));
        }
        if inner.paused.insert(sector.clone()) {
            tracing::warn!(sector = %sector, "sector intake paused");
        }
        Ok(())
    }

    pub fn resume_sector(&self, sector: &SectorId) -> Result<(), SectorError> {
        let mut inner = self.inner.write();
        if !inner.sectors.contains_key(sector) {
            return Err(SectorError::UnknownSector(sector.clone()));
        }
        if inner.paused.remove(sector) {
            tracing::info!(sector = %sector, "sector intake resumed");
        }
        Ok(())
    }

    pub fn pause_all(&self) {
        self.inner.write().paused_globally = true;
        tracing::warn!("global intake paused");
    }

    pub fn resume_all(&self) {
        self.inner.write().paused_globally = false;
        tracing::info!("global intake resumed");
    }

    /// Whether new submissions are accepted for `sector`.
    pub fn intake_open(&self, sector: &SectorId) -> bool {
        let inner = self.inner.read();
        !inner.paused_globally && !inner.paused.contains(sector)
    }

    // ── Persistence ─────────────────────────────────────────────────────

    pub fn snapshot(&self) -> SectorStoreSnapshot {
        let inner = self.inner.read();
        let mut configs: Vec<EntityTypeConfig> = inner
            .history
            .values()
            .flat_map(|versions| versions.iter().map(|c| c.as_ref().clone()))
            .collect();
        configs.sort_by(|a, b| {
            (&a.sector_id, a.entity_type, a.version).cmp(&(&b.sector_id, b.entity_type, b.version))
        });
        SectorStoreSnapshot {
            sectors: inner.sectors.values().cloned().collect(),
            configs,
            paused: inner.paused.iter().cloned().collect(),
            paused_globally: inner.paused_globally,
        }
    }

    /// Rebuild a store from a snapshot, preserving every version number.
    pub fn restore(snapshot: SectorStoreSnapshot) -> Self {
        let mut inner = StoreInner {
            sectors: snapshot
                .sectors
                .into_iter()
                .map(|p| (p.sector_id.clone(), p))
                .collect(),
            paused: snapshot.paused.into_iter().collect(),
            paused_globally: snapshot.paused_globally,
            ..StoreInner::default()
        };
        for cfg in snapshot.configs {
            inner
                .history
                .entry((cfg.sector_id.clone(), cfg.entity_type))
                .or_default()
                .push(Arc::new(cfg));
        }
        for versions in inner.history.values_mut() {
            versions.sort_by_key(|c| c.version);
        }
        Self {
            inner: RwLock::new(inner),
        }
    }
}

/// Serializable contents of a [`SectorConfigStore`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorStoreSnapshot {
    pub sectors: Vec<SectorPolicy>,
    /// All versions of all configs, ordered by key then version.
    pub configs: Vec<EntityTypeConfig>,
    pub paused: Vec<SectorId>,
    pub paused_globally: bool,
}
