//! Quality oracle: connects intake, voting, resolution, settlement and
//! disputes into a single thread-safe engine.
//!
//! Lock order, outermost first: command gate, validation, dispute manager,
//! registry, events. The registry never waits on a validation.

use crate::dispute::{Dispute, DisputeManager, DisputeResolution, DisputeSnapshot};
use crate::error::ValidationError;
use crate::prescore::resolve_pre_score;
use crate::queue::{SharedValidation, SubmitRequest, ValidationQueue};
use crate::resolver::QuorumResolver;
use crate::settlement::{self, SettlementPlan, SettlementSummary};
use crate::state::{Outcome, Validation, ValidationStatus, VoteChoice};
use crate::stats::SectorStats;
use crate::voting::{VoteDecision, WeightedVotingEngine};
use oracle_ledger::{IdempotencyKey, LedgerError, TokenLedger};
use oracle_sectors::{EntityTypeConfig, SectorConfigStore, SectorPolicy, SectorStoreSnapshot};
use oracle_types::{
    Address, Clock, DisputeId, EntityId, EntityType, OracleParams, PreScoreProvider, SectorId,
    Timestamp, ValidationId,
};
use oracle_validators::{RegistryEntry, Validator, ValidatorRegistry};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Events emitted by the oracle for the node to process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OracleEvent {
    ValidatorRegistered {
        validator: Address,
        stake: u128,
    },
    EntitySubmitted {
        validation: ValidationId,
        sector: SectorId,
        entity: EntityId,
        entity_type: EntityType,
        assigned: Vec<Address>,
    },
    VoteCast {
        validation: ValidationId,
        validator: Address,
        choice: VoteChoice,
        weight: u128,
    },
    /// The single decision transition out of `Pending`.
    ValidationDecided {
        validation: ValidationId,
        outcome: Outcome,
        timed_out: bool,
    },
    /// Settlement completed, after a decision, a dispute or a retry.
    ValidationFinalized {
        validation: ValidationId,
        outcome: Outcome,
        summary: SettlementSummary,
    },
    SettlementFailed {
        validation: ValidationId,
        error: LedgerError,
    },
    SettlementReconciled {
        validation: ValidationId,
        note: String,
    },
    DisputeRaised {
        dispute: DisputeId,
        validation: ValidationId,
        challenger: Address,
        stake: u128,
    },
    DisputeUnderReview {
        dispute: DisputeId,
        arbitrator: Address,
    },
    DisputeResolved {
        dispute: DisputeId,
        validation: ValidationId,
        resolution: DisputeResolution,
        outcome: Outcome,
    },
    ValidatorSuspended {
        validator: Address,
    },
    ValidatorReactivated {
        validator: Address,
    },
    ConfigPublished {
        sector: SectorId,
        entity_type: EntityType,
        version: u32,
    },
    /// `None` means every sector.
    IntakePaused {
        sector: Option<SectorId>,
    },
    IntakeResumed {
        sector: Option<SectorId>,
    },
}

/// Engine settings fixed for the oracle's lifetime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OracleSettings {
    pub params: OracleParams,
    /// Root of every cohort draw.
    pub selection_seed: [u8; 32],
    pub arbitrators: Vec<Address>,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            params: OracleParams::default(),
            selection_seed: [0u8; 32],
            arbitrators: Vec::new(),
        }
    }
}

/// Result of a recorded vote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteReceipt {
    pub validation: ValidationId,
    /// Weight the vote was counted with.
    pub weight: u128,
    pub decision: VoteDecision,
    /// Status after the vote, including any settlement it triggered.
    pub status: ValidationStatus,
}

/// Serializable state of a [`QualityOracle`] for persistence across restarts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleSnapshot {
    pub sectors: SectorStoreSnapshot,
    pub registry_journal: Vec<RegistryEntry>,
    pub validations: Vec<Validation>,
    pub next_validation_id: u64,
    pub disputes: DisputeSnapshot,
}

pub struct QualityOracle {
    settings: OracleSettings,
    voting: WeightedVotingEngine,
    sectors: Arc<SectorConfigStore>,
    registry: RwLock<ValidatorRegistry>,
    queue: ValidationQueue,
    disputes: Mutex<DisputeManager>,
    ledger: Arc<dyn TokenLedger>,
    clock: Arc<dyn Clock>,
    pre_score: Option<Arc<dyn PreScoreProvider>>,
    /// Commands hold it shared; `snapshot` holds it exclusively.
    gate: RwLock<()>,
    pending_events: Mutex<Vec<OracleEvent>>,
}

impl QualityOracle {
    pub fn new(
        settings: OracleSettings,
        sectors: Arc<SectorConfigStore>,
        ledger: Arc<dyn TokenLedger>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ValidationError> {
        settings
            .params
            .validate()
            .map_err(ValidationError::InvalidParams)?;
        let registry = ValidatorRegistry::new(settings.params.clone());
        let queue = ValidationQueue::new(settings.selection_seed);
        Ok(Self::assemble(
            settings,
            sectors,
            registry,
            queue,
            DisputeSnapshot::default(),
            ledger,
            clock,
        ))
    }

    /// Rebuild an oracle from a snapshot. The registry is replayed from its journal.
    pub fn restore(
        snapshot: OracleSnapshot,
        settings: OracleSettings,
        ledger: Arc<dyn TokenLedger>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ValidationError> {
        settings
            .params
            .validate()
            .map_err(ValidationError::InvalidParams)?;
        let registry = ValidatorRegistry::replay(settings.params.clone(), &snapshot.registry_journal)?;
        let queue = ValidationQueue::restore(
            settings.selection_seed,
            snapshot.next_validation_id,
            snapshot.validations,
        );
        let sectors = Arc::new(SectorConfigStore::restore(snapshot.sectors));
        tracing::info!(
            validators = registry.len(),
            next_validation = queue.next_id(),
            "oracle restored from snapshot"
        );
        Ok(Self::assemble(settings, sectors, registry, queue, snapshot.disputes, ledger, clock))
    }

    fn assemble(
        settings: OracleSettings,
        sectors: Arc<SectorConfigStore>,
        registry: ValidatorRegistry,
        queue: ValidationQueue,
        disputes: DisputeSnapshot,
        ledger: Arc<dyn TokenLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            voting: WeightedVotingEngine::new(settings.params.early_finalization_epsilon_bps),
            disputes: Mutex::new(DisputeManager::restore(disputes, settings.arbitrators.iter().cloned())),
            settings,
            sectors,
            registry: RwLock::new(registry),
            queue,
            ledger,
            clock,
            pre_score: None,
            gate: RwLock::new(()),
            pending_events: Mutex::new(Vec::new()),
        }
    }

    /// Consult `provider` for submissions that carry no pre-score.
    pub fn with_pre_score_provider(mut self, provider: Arc<dyn PreScoreProvider>) -> Self {
        self.pre_score = Some(provider);
        self
    }

    pub fn settings(&self) -> &OracleSettings {
        &self.settings
    }

    pub fn sector_store(&self) -> &Arc<SectorConfigStore> {
        &self.sectors
    }

    // ── Validators ──────────────────────────────────────────────────────

    /// Escrow `stake` through the ledger and register the validator.
    pub fn register_validator(
        &self,
        address: Address,
        stake: u128,
        sectors: &[SectorId],
    ) -> Result<Validator, ValidationError> {
        let _gate = self.gate.read();
        let now = self.clock.now();
        let mut registry = self.registry.write();
        registry.check_registration(&address, stake, sectors, &self.sectors)?;
        self.ledger
            .escrow_stake(&IdempotencyKey::registration(&address), &address, stake)?;
        let validator = registry
            .register(address, stake, sectors, &self.sectors, now)?
            .clone();
        drop(registry);
        self.emit(OracleEvent::ValidatorRegistered {
            validator: validator.address.clone(),
            stake,
        });
        Ok(validator)
    }

    /// Take a validator out of future cohorts. Returns `false` if it was not active.
    pub fn suspend_validator(&self, address: &Address) -> Result<bool, ValidationError> {
        let _gate = self.gate.read();
        let changed = self.registry.write().suspend(address, self.clock.now())?;
        if changed {
            self.emit(OracleEvent::ValidatorSuspended {
                validator: address.clone(),
            });
        }
        Ok(changed)
    }

    /// Return a suspended or slashed validator to the pool.
    pub fn reactivate_validator(&self, address: &Address) -> Result<bool, ValidationError> {
        let _gate = self.gate.read();
        let changed = self
            .registry
            .write()
            .reactivate(address, &self.sectors, self.clock.now())?;
        if changed {
            self.emit(OracleEvent::ValidatorReactivated {
                validator: address.clone(),
            });
        }
        Ok(changed)
    }

    // ── Sectors ─────────────────────────────────────────────────────────

    pub fn upsert_sector(&self, policy: SectorPolicy) -> Result<(), ValidationError> {
        let _gate = self.gate.read();
        Ok(self.sectors.upsert_sector(policy)?)
    }

    /// Publish a new config version. In-flight validations keep their snapshot.
    pub fn upsert_entity_type_config(
        &self,
        config: EntityTypeConfig,
    ) -> Result<Arc<EntityTypeConfig>, ValidationError> {
        let _gate = self.gate.read();
        let published = self.sectors.upsert_config(config)?;
        self.emit(OracleEvent::ConfigPublished {
            sector: published.sector_id.clone(),
            entity_type: published.entity_type,
            version: published.version,
        });
        Ok(published)
    }

    pub fn pause_sector(&self, sector: &SectorId) -> Result<(), ValidationError> {
        let _gate = self.gate.read();
        self.sectors.pause_sector(sector)?;
        self.emit(OracleEvent::IntakePaused {
            sector: Some(sector.clone()),
        });
        Ok(())
    }

    pub fn resume_sector(&self, sector: &SectorId) -> Result<(), ValidationError> {
        let _gate = self.gate.read();
        self.sectors.resume_sector(sector)?;
        self.emit(OracleEvent::IntakeResumed {
            sector: Some(sector.clone()),
        });
        Ok(())
    }

    pub fn pause_all(&self) {
        let _gate = self.gate.read();
        self.sectors.pause_all();
        self.emit(OracleEvent::IntakePaused { sector: None });
    }

    pub fn resume_all(&self) {
        let _gate = self.gate.read();
        self.sectors.resume_all();
        self.emit(OracleEvent::IntakeResumed { sector: None });
    }

    // ── Validation lifecycle ────────────────────────────────────────────

    /// Open a validation for an entity and draw its cohort.
    pub fn submit_entity(&self, request: SubmitRequest) -> Result<Validation, ValidationError> {
        let _gate = self.gate.read();
        let now = self.clock.now();
        let pre_score = resolve_pre_score(
            request.pre_score,
            self.pre_score.as_deref(),
            &request.entity_id,
            &request.sector_id,
            request.entity_type,
        )?;
        let shared = {
            let registry = self.registry.read();
            self.queue
                .submit(&request, pre_score, &self.sectors, &registry, now)?
        };
        let validation = shared.lock().clone();
        self.emit(OracleEvent::EntitySubmitted {
            validation: validation.id,
            sector: validation.sector_id.clone(),
            entity: validation.entity_id.clone(),
            entity_type: validation.entity_type,
            assigned: validation.assigned.iter().map(|a| a.validator.clone()).collect(),
        });
        Ok(validation)
    }

    /// Record a vote. A vote that decides the validation also settles it.
    ///
    /// A settlement failure does not fail the vote: the receipt reports
    /// `SettlementFailed` and the validation waits for an operator.
    pub fn cast_vote(
        &self,
        validation_id: ValidationId,
        validator: &Address,
        choice: VoteChoice,
        reason: impl Into<String>,
    ) -> Result<VoteReceipt, ValidationError> {
        let _gate = self.gate.read();
        let shared = self.shared(validation_id)?;
        let mut validation = shared.lock();
        let now = self.clock.now();
        // Unregistered voters are never assigned and fail as NotAssigned.
        let current_weight = self.registry.read().vote_weight(validator).unwrap_or(0);
        let decision = self
            .voting
            .cast_vote(&mut validation, validator, current_weight, choice, reason, now)?;
        let weight = validation
            .votes
            .get(validator)
            .map(|v| v.weight)
            .unwrap_or(0);
        tracing::debug!(validation = %validation_id, %validator, ?choice, weight, "vote cast");
        self.emit(OracleEvent::VoteCast {
            validation: validation_id,
            validator: validator.clone(),
            choice,
            weight,
        });

        if let VoteDecision::Decided(outcome) = decision {
            self.decide(&mut validation, outcome, false, now);
        }
        Ok(VoteReceipt {
            validation: validation_id,
            weight,
            decision,
            status: validation.status,
        })
    }

    /// Decide every pending validation whose voting window has elapsed.
    ///
    /// Returns the ids that timed out on this call. Safe to run repeatedly.
    pub fn check_timeouts(&self) -> Vec<ValidationId> {
        let _gate = self.gate.read();
        let now = self.clock.now();
        let mut timed_out = Vec::new();
        for shared in self.queue.all() {
            let mut validation = shared.lock();
            if QuorumResolver::voting_expired(&validation, now) {
                self.decide(&mut validation, Outcome::Rejected, true, now);
                timed_out.push(validation.id);
            }
        }
        if !timed_out.is_empty() {
            tracing::info!(count = timed_out.len(), "validations timed out");
        }
        timed_out
    }

    fn decide(&self, validation: &mut Validation, outcome: Outcome, timed_out: bool, now: Timestamp) {
        if !QuorumResolver::conclude(validation, outcome, timed_out, now) {
            return;
        }
        self.emit(OracleEvent::ValidationDecided {
            validation: validation.id,
            outcome,
            timed_out,
        });
        let plan = settlement::plan_finalization(validation, outcome);
        // Failure parks the validation and is reported through events.
        let _ = self.settle(validation, plan, now);
    }

    /// Execute a settlement plan: ledger first, registry only after every
    /// ledger step went through.
    fn settle(
        &self,
        validation: &mut Validation,
        plan: SettlementPlan,
        now: Timestamp,
    ) -> Result<SettlementSummary, LedgerError> {
        if let Err(error) = settlement::execute_ledger(&plan, self.ledger.as_ref()) {
            tracing::error!(
                validation = %validation.id,
                kind = ?plan.kind,
                error = %error,
                "settlement failed, awaiting operator"
            );
            QuorumResolver::mark_settlement_failed(validation, plan);
            self.emit(OracleEvent::SettlementFailed {
                validation: validation.id,
                error: error.clone(),
            });
            return Err(error);
        }
        settlement::apply_registry(&plan, &mut self.registry.write(), now);
        QuorumResolver::mark_settled(validation);
        tracing::info!(
            validation = %validation.id,
            outcome = %plan.outcome,
            fees_paid = plan.summary.fees_paid,
            slashed = plan.summary.slashed,
            "validation finalized"
        );
        self.emit(OracleEvent::ValidationFinalized {
            validation: validation.id,
            outcome: plan.outcome,
            summary: plan.summary,
        });
        Ok(plan.summary)
    }

    // ── Settlement recovery ─────────────────────────────────────────────

    /// Re-run a failed settlement with its original idempotency keys.
    pub fn retry_settlement(&self, validation_id: ValidationId) -> Result<SettlementSummary, ValidationError> {
        let _gate = self.gate.read();
        let shared = self.shared(validation_id)?;
        let mut validation = shared.lock();
        let plan = Self::failed_plan(&validation)?;
        tracing::info!(validation = %validation_id, "retrying settlement");
        Ok(self.settle(&mut validation, plan, self.clock.now())?)
    }

    /// Attest that an operator reconciled the ledger by hand.
    ///
    /// Applies the registry side of the failed settlement and finalizes.
    pub fn mark_reconciled(&self, validation_id: ValidationId, note: impl Into<String>) -> Result<(), ValidationError> {
        let _gate = self.gate.read();
        let shared = self.shared(validation_id)?;
        let mut validation = shared.lock();
        let plan = Self::failed_plan(&validation)?;
        let note = note.into();
        settlement::apply_registry(&plan, &mut self.registry.write(), self.clock.now());
        QuorumResolver::mark_settled(&mut validation);
        validation.reconciliation_note = Some(note.clone());
        tracing::warn!(validation = %validation_id, %note, "settlement reconciled manually");
        self.emit(OracleEvent::SettlementReconciled {
            validation: validation_id,
            note,
        });
        Ok(())
    }

    fn failed_plan(validation: &Validation) -> Result<SettlementPlan, ValidationError> {
        if validation.status != ValidationStatus::SettlementFailed {
            return Err(ValidationError::NoFailedSettlement(validation.id));
        }
        validation
            .pending_settlement
            .clone()
            .ok_or(ValidationError::NoFailedSettlement(validation.id))
    }

    // ── Disputes ────────────────────────────────────────────────────────

    /// Challenge a finalized outcome. The stake is escrowed before the
    /// dispute is recorded.
    pub fn raise_dispute(
        &self,
        validation_id: ValidationId,
        challenger: Address,
        challenger_stake: u128,
        reason: impl Into<String>,
    ) -> Result<Dispute, ValidationError> {
        let _gate = self.gate.read();
        if !challenger.is_valid() {
            return Err(ValidationError::InvalidAddress(challenger));
        }
        let shared = self.shared(validation_id)?;
        let mut validation = shared.lock();
        let now = self.clock.now();
        let mut disputes = self.disputes.lock();
        disputes.check_raise(&validation, challenger_stake, now)?;

        let key = IdempotencyKey::settlement(
            validation_id,
            &disputes.next_id().to_string(),
            "escrow",
            &challenger,
        );
        self.ledger.escrow_stake(&key, &challenger, challenger_stake)?;
        let dispute = disputes.open(&mut validation, challenger, challenger_stake, reason, now);
        drop(disputes);

        self.emit(OracleEvent::DisputeRaised {
            dispute: dispute.id,
            validation: validation_id,
            challenger: dispute.raised_by.clone(),
            stake: challenger_stake,
        });
        Ok(dispute)
    }

    pub fn begin_review(&self, dispute_id: DisputeId, arbitrator: &Address) -> Result<Dispute, ValidationError> {
        let _gate = self.gate.read();
        let dispute = self.disputes.lock().begin_review(dispute_id, arbitrator)?;
        self.emit(OracleEvent::DisputeUnderReview {
            dispute: dispute_id,
            arbitrator: arbitrator.clone(),
        });
        Ok(dispute)
    }

    /// Resolve a dispute and settle its consequences.
    ///
    /// On `Overturned` the validation's outcome flips and the original is kept
    /// in `original_outcome`. The validation ends `Finalized`, or
    /// `SettlementFailed` if the ledger refused a step.
    pub fn resolve_dispute(
        &self,
        dispute_id: DisputeId,
        resolution: DisputeResolution,
        arbitrator: &Address,
    ) -> Result<Dispute, ValidationError> {
        let _gate = self.gate.read();
        let validation_id = self
            .disputes
            .lock()
            .check_resolve(dispute_id, arbitrator)?
            .validation_id;
        let shared = self.shared(validation_id)?;
        let mut validation = shared.lock();
        let now = self.clock.now();
        let mut disputes = self.disputes.lock();
        let dispute = disputes.check_resolve(dispute_id, arbitrator)?;
        let original = validation.outcome.ok_or(ValidationError::NotFinalized {
            validation: validation_id,
            status: validation.status,
        })?;

        let plan = {
            let registry = self.registry.read();
            settlement::plan_dispute(
                &validation,
                dispute,
                resolution,
                original,
                |address| registry.get(address).map_or(0, |v| v.staked_amount),
                &self.settings.params,
            )
        };
        let dispute = disputes.close(dispute_id, resolution, arbitrator, now)?;
        drop(disputes);

        if resolution == DisputeResolution::Overturned {
            validation.original_outcome = Some(original);
            validation.outcome = Some(plan.outcome);
        }
        self.emit(OracleEvent::DisputeResolved {
            dispute: dispute_id,
            validation: validation_id,
            resolution,
            outcome: plan.outcome,
        });
        // Failure parks the validation and is reported through events.
        let _ = self.settle(&mut validation, plan, now);
        Ok(dispute)
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn validation(&self, id: ValidationId) -> Option<Validation> {
        self.queue.get(id).map(|shared| shared.lock().clone())
    }

    pub fn validations(&self) -> Vec<Validation> {
        let mut all: Vec<Validation> = self.queue.all().iter().map(|s| s.lock().clone()).collect();
        all.sort_by_key(|v| v.id);
        all
    }

    pub fn validator(&self, address: &Address) -> Option<Validator> {
        self.registry.read().get(address).cloned()
    }

    pub fn validators(&self) -> Vec<Validator> {
        self.registry.read().validators().cloned().collect()
    }

    pub fn dispute(&self, id: DisputeId) -> Option<Dispute> {
        self.disputes.lock().get(id).cloned()
    }

    pub fn disputes(&self) -> Vec<Dispute> {
        self.disputes.lock().disputes().cloned().collect()
    }

    /// Latest config of every sector and entity type.
    pub fn configs(&self) -> Vec<Arc<EntityTypeConfig>> {
        self.sectors.configs()
    }

    pub fn sector_stats(&self, sector: &SectorId) -> SectorStats {
        let validations: Vec<Validation> = self
            .queue
            .sector(sector)
            .iter()
            .map(|s| s.lock().clone())
            .collect();
        SectorStats::compute(sector.clone(), &validations)
    }

    /// Stats for every defined sector and every sector holding validations.
    pub fn all_sector_stats(&self) -> Vec<SectorStats> {
        let sectors: BTreeSet<SectorId> = self
            .sectors
            .sectors()
            .into_iter()
            .map(|p| p.sector_id)
            .chain(self.queue.sector_ids())
            .collect();
        sectors.iter().map(|s| self.sector_stats(s)).collect()
    }

    /// Validations parked in `SettlementFailed`, awaiting an operator.
    pub fn settlement_failures(&self) -> Vec<Validation> {
        self.validations()
            .into_iter()
            .filter(|v| v.status == ValidationStatus::SettlementFailed)
            .collect()
    }

    /// Drain pending events for the node to process.
    pub fn drain_events(&self) -> Vec<OracleEvent> {
        std::mem::take(&mut *self.pending_events.lock())
    }

    /// Capture the full engine state. Waits for in-flight commands to finish.
    pub fn snapshot(&self) -> OracleSnapshot {
        self.snapshot_with(|| ()).0
    }

    /// Capture the engine state and run `capture` before any further command
    /// starts. State kept outside the engine, such as the token ledger, taken
    /// inside `capture` matches the engine snapshot exactly.
    pub fn snapshot_with<T>(&self, capture: impl FnOnce() -> T) -> (OracleSnapshot, T) {
        let _gate = self.gate.write();
        let snapshot = OracleSnapshot {
            sectors: self.sectors.snapshot(),
            registry_journal: self.registry.read().journal().to_vec(),
            validations: self.validations(),
            next_validation_id: self.queue.next_id(),
            disputes: self.disputes.lock().snapshot(),
        };
        (snapshot, capture())
    }

    fn shared(&self, id: ValidationId) -> Result<SharedValidation, ValidationError> {
        self.queue.get(id).ok_or(ValidationError::ValidationNotFound(id))
    }

    fn emit(&self, event: OracleEvent) {
        self.pending_events.lock().push(event);
    }
}
