//! Validation queue: intake, cohort assignment and per-sector storage.
//!
//! Each sector owns its own map of validations, and each validation sits
//! behind its own mutex: votes on different validations, or in different
//! sectors, never contend.

use crate::error::ValidationError;
use crate::state::{Assignment, Validation};
use oracle_sectors::SectorConfigStore;
use oracle_types::{EntityId, EntityType, SectorId, Timestamp, ValidationId};
use oracle_validators::{derive_seed, ValidatorRegistry};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub type SharedValidation = Arc<Mutex<Validation>>;

/// An entity handed to the oracle for validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub entity_id: EntityId,
    pub sector_id: SectorId,
    pub entity_type: EntityType,
    /// Advisory 0–100 score. Consulted by voters, never by the tally.
    pub pre_score: Option<u8>,
}

impl SubmitRequest {
    pub fn new(entity_id: impl Into<String>, sector_id: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            entity_id: EntityId::new(entity_id),
            sector_id: SectorId::new(sector_id),
            entity_type,
            pre_score: None,
        }
    }

    pub fn with_pre_score(mut self, score: u8) -> Self {
        self.pre_score = Some(score);
        self
    }
}

#[derive(Default)]
struct SectorQueue {
    validations: RwLock<BTreeMap<ValidationId, SharedValidation>>,
    /// Entity to its validation; an entity is validated at most once per sector.
    by_entity: Mutex<HashMap<EntityId, ValidationId>>,
}

pub struct ValidationQueue {
    seed: [u8; 32],
    next_id: AtomicU64,
    sectors: RwLock<HashMap<SectorId, Arc<SectorQueue>>>,
    index: RwLock<HashMap<ValidationId, SectorId>>,
}

impl ValidationQueue {
    /// `seed` makes every cohort draw reproducible for audit.
    pub fn new(seed: [u8; 32]) -> Self {
        Self {
            seed,
            next_id: AtomicU64::new(1),
            sectors: RwLock::new(HashMap::new()),
            index: RwLock::new(HashMap::new()),
        }
    }

    /// Rebuild from persisted validations.
    pub fn restore(seed: [u8; 32], next_id: u64, validations: Vec<Validation>) -> Self {
        let queue = Self::new(seed);
        let mut max_id = 0;
        for validation in validations {
            max_id = max_id.max(validation.id.as_u64());
            queue.insert(validation);
        }
        queue
            .next_id
            .store(next_id.max(max_id + 1), Ordering::SeqCst);
        queue
    }

    pub fn next_id(&self) -> u64 {
        self.next_id.load(Ordering::SeqCst)
    }

    /// Seed for one validation's cohort draw.
    pub fn cohort_seed(&self, id: ValidationId, entity: &EntityId) -> [u8; 32] {
        derive_seed(&[&self.seed, &id.as_u64().to_le_bytes(), entity.as_str().as_bytes()])
    }

    /// Create a pending validation and draw its cohort.
    ///
    /// `pre_score` must already be resolved and range-checked.
    pub fn submit(
        &self,
        request: &SubmitRequest,
        pre_score: Option<u8>,
        sectors: &SectorConfigStore,
        registry: &ValidatorRegistry,
        now: Timestamp,
    ) -> Result<SharedValidation, ValidationError> {
        let config = sectors.get_config(&request.sector_id, request.entity_type)?;
        if !sectors.intake_open(&request.sector_id) {
            return Err(ValidationError::IntakePaused(request.sector_id.clone()));
        }
        if !config.active {
            return Err(ValidationError::SectorDisabled {
                sector: request.sector_id.clone(),
                entity_type: request.entity_type,
            });
        }

        let sector_queue = self.sector_queue(&request.sector_id);
        let mut by_entity = sector_queue.by_entity.lock();
        if let Some(existing) = by_entity.get(&request.entity_id) {
            return Err(ValidationError::EntityAlreadySubmitted {
                sector: request.sector_id.clone(),
                entity: request.entity_id.clone(),
                existing: *existing,
            });
        }

        // The id is claimed only once the cohort is confirmed, so rejected
        // submissions leave no gaps. A lost race redraws under the next id.
        let needed = config.quorum_size as usize;
        let (id, assigned) = loop {
            let candidate = self.next_id.load(Ordering::SeqCst);
            let id = ValidationId::new(candidate);
            let seed = self.cohort_seed(id, &request.entity_id);
            let cohort = registry.assignable(&request.sector_id, &seed, needed);
            if cohort.len() < needed {
                tracing::warn!(
                    sector = %request.sector_id,
                    entity = %request.entity_id,
                    needed,
                    available = cohort.len(),
                    "not enough validators for submission"
                );
                return Err(ValidationError::InsufficientValidators {
                    sector: request.sector_id.clone(),
                    needed,
                    available: cohort.len(),
                });
            }

            let assigned = cohort
                .into_iter()
                .map(|validator| {
                    let weight = registry.vote_weight(&validator)?;
                    Ok(Assignment { validator, weight })
                })
                .collect::<Result<Vec<_>, ValidationError>>()?;

            if self
                .next_id
                .compare_exchange(candidate, candidate + 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                break (id, assigned);
            }
        };

        let validation = Validation::new(
            id,
            request.entity_id.clone(),
            config.as_ref().clone(),
            pre_score,
            assigned,
            now,
        );
        tracing::info!(
            validation = %id,
            sector = %validation.sector_id,
            entity = %validation.entity_id,
            entity_type = %validation.entity_type,
            config_version = validation.config.version,
            quorum = needed,
            "validation submitted"
        );

        by_entity.insert(request.entity_id.clone(), id);
        drop(by_entity);
        Ok(self.insert(validation))
    }

    pub fn get(&self, id: ValidationId) -> Option<SharedValidation> {
        let sector = self.index.read().get(&id).cloned()?;
        let queue = self.sectors.read().get(&sector).cloned()?;
        let validations = queue.validations.read();
        validations.get(&id).cloned()
    }

    /// Validations of one sector, ordered by id.
    pub fn sector(&self, sector: &SectorId) -> Vec<SharedValidation> {
        let Some(queue) = self.sectors.read().get(sector).cloned() else {
            return Vec::new();
        };
        let validations = queue.validations.read();
        validations.values().cloned().collect()
    }

    /// Every validation, grouped by sector and ordered by id within a sector.
    pub fn all(&self) -> Vec<SharedValidation> {
        let queues: Vec<Arc<SectorQueue>> = self.sectors.read().values().cloned().collect();
        let mut all: Vec<SharedValidation> = Vec::new();
        for queue in queues {
            all.extend(queue.validations.read().values().cloned());
        }
        all
    }

    pub fn sector_ids(&self) -> Vec<SectorId> {
        let mut ids: Vec<SectorId> = self.sectors.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn sector_queue(&self, sector: &SectorId) -> Arc<SectorQueue> {
        if let Some(queue) = self.sectors.read().get(sector) {
            return Arc::clone(queue);
        }
        Arc::clone(self.sectors.write().entry(sector.clone()).or_default())
    }

    fn insert(&self, validation: Validation) -> SharedValidation {
        let id = validation.id;
        let sector = validation.sector_id.clone();
        let queue = self.sector_queue(&sector);
        queue
            .by_entity
            .lock()
            .insert(validation.entity_id.clone(), id);
        let shared = Arc::new(Mutex::new(validation));
        queue.validations.write().insert(id, Arc::clone(&shared));
        self.index.write().insert(id, sector);
        shared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oracle_sectors::{EntityTypeConfig, SectorPolicy};
    use oracle_types::{Address, OracleParams};

    fn setup(validators: usize) -> (SectorConfigStore, ValidatorRegistry) {
        let sectors = SectorConfigStore::new();
        sectors.upsert_sector(SectorPolicy::new("market", 100)).unwrap();
        sectors
            .upsert_config(EntityTypeConfig {
                quorum_size: 3,
                ..EntityTypeConfig::defaults_for(SectorId::from("market"), EntityType::Product)
            })
            .unwrap();
        let mut registry = ValidatorRegistry::new(OracleParams::default());
        for i in 0..validators {
            registry
                .register(
                    Address::new(format!("val{i}")),
                    1_000,
                    &[SectorId::from("market")],
                    &sectors,
                    Timestamp::EPOCH,
                )
                .unwrap();
        }
        (sectors, registry)
    }

    fn request(entity: &str) -> SubmitRequest {
        SubmitRequest::new(entity, "market", EntityType::Product)
    }

    #[test]
    fn submit_assigns_quorum_with_frozen_weights() {
        let (sectors, registry) = setup(5);
        let queue = ValidationQueue::new([0u8; 32]);
        let shared = queue
            .submit(&request("item-1"), Some(80), &sectors, &registry, Timestamp::new(5))
            .unwrap();
        let v = shared.lock();
        assert_eq!(v.assigned.len(), 3);
        assert!(v.assigned.iter().all(|a| a.weight == 1_000));
        assert_eq!(v.config.version, 1);
        assert_eq!(v.ai_pre_score, Some(80));
        assert!(queue.get(v.id).is_some());
    }

    #[test]
    fn too_few_validators_is_immediate() {
        let (sectors, registry) = setup(2);
        let queue = ValidationQueue::new([0u8; 32]);
        let err = queue
            .submit(&request("item-1"), None, &sectors, &registry, Timestamp::new(5))
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InsufficientValidators { needed: 3, available: 2, .. }
        ));
        assert!(queue.all().is_empty());
    }

    #[test]
    fn rejected_submission_does_not_consume_an_id() {
        let (sectors, mut registry) = setup(2);
        let queue = ValidationQueue::new([0u8; 32]);
        assert!(queue
            .submit(&request("item-1"), None, &sectors, &registry, Timestamp::new(5))
            .is_err());
        assert_eq!(queue.next_id(), 1);

        registry
            .register(
                Address::new("val2"),
                1_000,
                &[SectorId::from("market")],
                &sectors,
                Timestamp::new(6),
            )
            .unwrap();
        let shared = queue
            .submit(&request("item-1"), None, &sectors, &registry, Timestamp::new(7))
            .unwrap();
        assert_eq!(shared.lock().id, ValidationId::new(1));
        assert_eq!(queue.next_id(), 2);
    }

    #[test]
    fn inactive_config_and_paused_sector_refused() {
        let (sectors, registry) = setup(5);
        let queue = ValidationQueue::new([0u8; 32]);

        sectors.pause_sector(&SectorId::from("market")).unwrap();
        assert!(matches!(
            queue.submit(&request("a"), None, &sectors, &registry, Timestamp::EPOCH),
            Err(ValidationError::IntakePaused(_))
        ));
        sectors.resume_sector(&SectorId::from("market")).unwrap();

        sectors
            .upsert_config(EntityTypeConfig {
                active: false,
                quorum_size: 3,
                ..EntityTypeConfig::defaults_for(SectorId::from("market"), EntityType::Product)
            })
            .unwrap();
        assert!(matches!(
            queue.submit(&request("a"), None, &sectors, &registry, Timestamp::EPOCH),
            Err(ValidationError::SectorDisabled { .. })
        ));
    }

    #[test]
    fn entity_validated_once_per_sector() {
        let (sectors, registry) = setup(5);
        let queue = ValidationQueue::new([0u8; 32]);
        queue
            .submit(&request("item-1"), None, &sectors, &registry, Timestamp::EPOCH)
            .unwrap();
        assert!(matches!(
            queue.submit(&request("item-1"), None, &sectors, &registry, Timestamp::EPOCH),
            Err(ValidationError::EntityAlreadySubmitted { .. })
        ));
    }

    #[test]
    fn cohort_is_reproducible_from_seed() {
        let (sectors, registry) = setup(10);
        let a = ValidationQueue::new([3u8; 32]);
        let b = ValidationQueue::new([3u8; 32]);
        let va = a
            .submit(&request("x"), None, &sectors, &registry, Timestamp::EPOCH)
            .unwrap();
        let vb = b
            .submit(&request("x"), None, &sectors, &registry, Timestamp::EPOCH)
            .unwrap();
        assert_eq!(va.lock().assigned, vb.lock().assigned);
    }

    #[test]
    fn restore_continues_id_sequence() {
        let (sectors, registry) = setup(5);
        let queue = ValidationQueue::new([0u8; 32]);
        let v = queue
            .submit(&request("item-1"), None, &sectors, &registry, Timestamp::EPOCH)
            .unwrap()
            .lock()
            .clone();
        let restored = ValidationQueue::restore([0u8; 32], 0, vec![v.clone()]);
        assert_eq!(restored.next_id(), v.id.as_u64() + 1);
        assert!(matches!(
            restored.submit(&request("item-1"), None, &sectors, &registry, Timestamp::EPOCH),
            Err(ValidationError::EntityAlreadySubmitted { .. })
        ));
    }
}
