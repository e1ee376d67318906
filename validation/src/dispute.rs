//! Disputes: post-resolution challenges backed by escrowed collateral.

use crate::error::ValidationError;
use crate::state::{Validation, ValidationStatus};
use oracle_types::{Address, DisputeId, Timestamp, ValidationId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisputeStatus {
    Open,
    UnderReview,
    Resolved,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisputeResolution {
    /// The original outcome stands; the challenger forfeits the stake.
    Upheld,
    /// The original outcome is reversed; its backers are slashed.
    Overturned,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispute {
    pub id: DisputeId,
    pub validation_id: ValidationId,
    pub raised_by: Address,
    pub challenger_stake: u128,
    pub reason: String,
    pub status: DisputeStatus,
    pub resolution: Option<DisputeResolution>,
    pub arbitrator: Option<Address>,
    pub created_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
}

impl Dispute {
    pub fn is_active(&self) -> bool {
        self.status != DisputeStatus::Resolved
    }
}

/// Serializable contents of a [`DisputeManager`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeSnapshot {
    pub disputes: Vec<Dispute>,
    pub next_id: u64,
}

/// Owns every dispute and enforces one active dispute per validation.
pub struct DisputeManager {
    disputes: BTreeMap<DisputeId, Dispute>,
    active: BTreeMap<ValidationId, DisputeId>,
    arbitrators: BTreeSet<Address>,
    next_id: u64,
}

impl DisputeManager {
    pub fn new(arbitrators: impl IntoIterator<Item = Address>) -> Self {
        Self {
            disputes: BTreeMap::new(),
            active: BTreeMap::new(),
            arbitrators: arbitrators.into_iter().collect(),
            next_id: 1,
        }
    }

    pub fn restore(snapshot: DisputeSnapshot, arbitrators: impl IntoIterator<Item = Address>) -> Self {
        let mut manager = Self::new(arbitrators);
        manager.next_id = snapshot.next_id.max(1);
        for dispute in snapshot.disputes {
            if dispute.is_active() {
                manager.active.insert(dispute.validation_id, dispute.id);
            }
            manager.disputes.insert(dispute.id, dispute);
        }
        manager
    }

    pub fn snapshot(&self) -> DisputeSnapshot {
        DisputeSnapshot {
            disputes: self.disputes.values().cloned().collect(),
            next_id: self.next_id,
        }
    }

    pub fn get(&self, id: DisputeId) -> Option<&Dispute> {
        self.disputes.get(&id)
    }

    pub fn disputes(&self) -> impl Iterator<Item = &Dispute> {
        self.disputes.values()
    }

    pub fn active_for(&self, validation: ValidationId) -> Option<&Dispute> {
        self.active
            .get(&validation)
            .and_then(|id| self.disputes.get(id))
    }

    /// Id the next opened dispute will get.
    pub fn next_id(&self) -> DisputeId {
        DisputeId::new(self.next_id)
    }

    pub fn is_arbitrator(&self, address: &Address) -> bool {
        self.arbitrators.contains(address)
    }

    /// Check whether a dispute may be raised against `validation` now.
    ///
    /// The dispute window is measured from the decision time and is still
    /// open at exactly `dispute_timeout_days` elapsed.
    pub fn check_raise(
        &self,
        validation: &Validation,
        challenger_stake: u128,
        now: Timestamp,
    ) -> Result<(), ValidationError> {
        if self.active.contains_key(&validation.id) {
            return Err(ValidationError::DisputeAlreadyOpen(validation.id));
        }
        match validation.status {
            ValidationStatus::Finalized => {}
            ValidationStatus::SettlementFailed => {
                return Err(ValidationError::SettlementUnreconciled(validation.id))
            }
            status => {
                return Err(ValidationError::NotFinalized {
                    validation: validation.id,
                    status,
                })
            }
        }
        let resolved_at = validation.resolved_at.unwrap_or(validation.created_at);
        if resolved_at.window_elapsed(validation.config.dispute_window_secs(), now) {
            return Err(ValidationError::WindowExpired {
                validation: validation.id,
                resolved_at,
                now,
            });
        }
        let needed = validation.config.required_collateral;
        if challenger_stake < needed {
            return Err(ValidationError::InsufficientCollateral {
                needed,
                provided: challenger_stake,
            });
        }
        Ok(())
    }

    /// Record a new dispute and move the validation to `Disputed`.
    ///
    /// Call after [`check_raise`](Self::check_raise) passed and the stake was escrowed.
    pub fn open(
        &mut self,
        validation: &mut Validation,
        challenger: Address,
        challenger_stake: u128,
        reason: impl Into<String>,
        now: Timestamp,
    ) -> Dispute {
        let id = DisputeId::new(self.next_id);
        self.next_id += 1;
        let dispute = Dispute {
            id,
            validation_id: validation.id,
            raised_by: challenger,
            challenger_stake,
            reason: reason.into(),
            status: DisputeStatus::Open,
            resolution: None,
            arbitrator: None,
            created_at: now,
            resolved_at: None,
        };
        validation.status = ValidationStatus::Disputed;
        self.active.insert(validation.id, id);
        self.disputes.insert(id, dispute.clone());
        tracing::info!(
            dispute = %id,
            validation = %validation.id,
            challenger = %dispute.raised_by,
            stake = challenger_stake,
            "dispute raised"
        );
        dispute
    }

    /// Move an open dispute under review by `arbitrator`.
    pub fn begin_review(&mut self, id: DisputeId, arbitrator: &Address) -> Result<Dispute, ValidationError> {
        self.authorize(arbitrator)?;
        let dispute = self
            .disputes
            .get_mut(&id)
            .ok_or(ValidationError::DisputeNotFound(id))?;
        match dispute.status {
            DisputeStatus::Open => {
                dispute.status = DisputeStatus::UnderReview;
                dispute.arbitrator = Some(arbitrator.clone());
                tracing::info!(dispute = %id, %arbitrator, "dispute under review");
            }
            DisputeStatus::UnderReview => {}
            DisputeStatus::Resolved => return Err(ValidationError::DisputeNotActive(id)),
        }
        Ok(dispute.clone())
    }

    /// Check that `arbitrator` may resolve dispute `id` and return it.
    pub fn check_resolve(&self, id: DisputeId, arbitrator: &Address) -> Result<&Dispute, ValidationError> {
        self.authorize(arbitrator)?;
        let dispute = self
            .disputes
            .get(&id)
            .ok_or(ValidationError::DisputeNotFound(id))?;
        if !dispute.is_active() {
            return Err(ValidationError::DisputeNotActive(id));
        }
        Ok(dispute)
    }

    /// Mark a dispute resolved. The validation's status is the caller's to set.
    pub fn close(
        &mut self,
        id: DisputeId,
        resolution: DisputeResolution,
        arbitrator: &Address,
        now: Timestamp,
    ) -> Result<Dispute, ValidationError> {
        let dispute = self
            .disputes
            .get_mut(&id)
            .ok_or(ValidationError::DisputeNotFound(id))?;
        dispute.status = DisputeStatus::Resolved;
        dispute.resolution = Some(resolution);
        dispute.arbitrator = Some(arbitrator.clone());
        dispute.resolved_at = Some(now);
        self.active.remove(&dispute.validation_id);
        tracing::info!(dispute = %id, ?resolution, %arbitrator, "dispute resolved");
        Ok(dispute.clone())
    }

    fn authorize(&self, arbitrator: &Address) -> Result<(), ValidationError> {
        if self.is_arbitrator(arbitrator) {
            Ok(())
        } else {
            Err(ValidationError::Unauthorized(arbitrator.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Assignment, Outcome};
    use oracle_sectors::EntityTypeConfig;
    use oracle_types::{EntityId, EntityType, SectorId, SECS_PER_DAY};

    const RESOLVED: u64 = 1_000_000;

    fn finalized() -> Validation {
        let config = EntityTypeConfig {
            required_collateral: 100,
            dispute_timeout_days: 7,
            ..EntityTypeConfig::defaults_for(SectorId::from("market"), EntityType::Product)
        };
        let mut v = Validation::new(
            ValidationId::new(5),
            EntityId::from("item"),
            config,
            None,
            vec![Assignment {
                validator: Address::from("a"),
                weight: 1,
            }],
            Timestamp::new(RESOLVED - 100),
        );
        v.status = ValidationStatus::Finalized;
        v.outcome = Some(Outcome::Approved);
        v.resolved_at = Some(Timestamp::new(RESOLVED));
        v
    }

    fn manager() -> DisputeManager {
        DisputeManager::new([Address::from("judge")])
    }

    #[test]
    fn window_boundary_is_inclusive() {
        let m = manager();
        let v = finalized();
        let window = 7 * SECS_PER_DAY;
        assert!(m.check_raise(&v, 100, Timestamp::new(RESOLVED + window - 1)).is_ok());
        assert!(m.check_raise(&v, 100, Timestamp::new(RESOLVED + window)).is_ok());
        assert!(matches!(
            m.check_raise(&v, 100, Timestamp::new(RESOLVED + window + 1)),
            Err(ValidationError::WindowExpired { .. })
        ));
    }

    #[test]
    fn collateral_and_status_checked() {
        let m = manager();
        let mut v = finalized();
        let now = Timestamp::new(RESOLVED + 1);
        assert!(matches!(
            m.check_raise(&v, 99, now),
            Err(ValidationError::InsufficientCollateral { needed: 100, provided: 99 })
        ));
        v.status = ValidationStatus::SettlementFailed;
        assert!(matches!(
            m.check_raise(&v, 100, now),
            Err(ValidationError::SettlementUnreconciled(_))
        ));
        v.status = ValidationStatus::Pending;
        assert!(matches!(
            m.check_raise(&v, 100, now),
            Err(ValidationError::NotFinalized { .. })
        ));
    }

    #[test]
    fn one_active_dispute_per_validation() {
        let mut m = manager();
        let mut v = finalized();
        let now = Timestamp::new(RESOLVED + 1);
        let d = m.open(&mut v, Address::from("c"), 100, "fake", now);
        assert_eq!(v.status, ValidationStatus::Disputed);
        assert!(matches!(
            m.check_raise(&v, 100, now),
            Err(ValidationError::DisputeAlreadyOpen(_))
        ));

        m.close(d.id, DisputeResolution::Upheld, &Address::from("judge"), now)
            .unwrap();
        v.status = ValidationStatus::Finalized;
        assert!(m.check_raise(&v, 100, now).is_ok());
    }

    #[test]
    fn only_arbitrators_review_and_resolve() {
        let mut m = manager();
        let mut v = finalized();
        let now = Timestamp::new(RESOLVED + 1);
        let d = m.open(&mut v, Address::from("c"), 100, "fake", now);

        assert!(matches!(
            m.begin_review(d.id, &Address::from("mallory")),
            Err(ValidationError::Unauthorized(_))
        ));
        let reviewed = m.begin_review(d.id, &Address::from("judge")).unwrap();
        assert_eq!(reviewed.status, DisputeStatus::UnderReview);

        assert!(m.check_resolve(d.id, &Address::from("mallory")).is_err());
        m.close(d.id, DisputeResolution::Overturned, &Address::from("judge"), now)
            .unwrap();
        assert!(matches!(
            m.check_resolve(d.id, &Address::from("judge")),
            Err(ValidationError::DisputeNotActive(_))
        ));
    }

    #[test]
    fn snapshot_restores_active_index() {
        let mut m = manager();
        let mut v = finalized();
        m.open(&mut v, Address::from("c"), 100, "fake", Timestamp::new(RESOLVED + 1));
        let restored = DisputeManager::restore(m.snapshot(), [Address::from("judge")]);
        assert!(restored.active_for(v.id).is_some());
        assert_eq!(restored.snapshot().next_id, 2);
    }
}
