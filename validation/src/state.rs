//! Validation records and their lifecycle states.

use crate::settlement::SettlementPlan;
use oracle_sectors::EntityTypeConfig;
use oracle_types::{Address, EntityId, EntityType, SectorId, Timestamp, ValidationId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteChoice {
    Approve,
    Reject,
}

/// The decided result of a validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Approved,
    Rejected,
}

impl Outcome {
    /// Whether a vote agreed with this outcome.
    pub fn backed_by(self, choice: VoteChoice) -> bool {
        matches!(
            (self, choice),
            (Self::Approved, VoteChoice::Approve) | (Self::Rejected, VoteChoice::Reject)
        )
    }

    pub fn flipped(self) -> Self {
        match self {
            Self::Approved => Self::Rejected,
            Self::Rejected => Self::Approved,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationStatus {
    /// Collecting votes.
    Pending,
    /// Decided by vote, settling.
    Approved,
    /// Decided by vote, settling.
    Rejected,
    /// Voting window elapsed without a decision; settling as Rejected.
    TimedOut,
    /// Settled. Open to disputes until the dispute window closes.
    Finalized,
    /// Reopened by an active dispute.
    Disputed,
    /// A ledger call failed during settlement; waits for an operator.
    SettlementFailed,
}

impl ValidationStatus {
    pub fn is_pending(self) -> bool {
        self == Self::Pending
    }
}

/// A validator drawn for a validation, with its weight frozen at assignment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub validator: Address,
    pub weight: u128,
}

/// A cast vote. Never modified once recorded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub validator: Address,
    pub choice: VoteChoice,
    pub weight: u128,
    pub reason: String,
    pub cast_at: Timestamp,
}

/// One entity's path from submission to a settled outcome.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    pub id: ValidationId,
    pub entity_id: EntityId,
    pub sector_id: SectorId,
    pub entity_type: EntityType,
    /// Policy in force at submission. Later config versions do not apply.
    pub config: EntityTypeConfig,
    pub ai_pre_score: Option<u8>,
    /// Cohort in selection order.
    pub assigned: Vec<Assignment>,
    pub votes: BTreeMap<Address, Vote>,
    pub status: ValidationStatus,
    pub outcome: Option<Outcome>,
    /// Outcome before a dispute overturned it.
    pub original_outcome: Option<Outcome>,
    pub timed_out: bool,
    pub created_at: Timestamp,
    /// When the decision was taken. Starts the dispute window.
    pub resolved_at: Option<Timestamp>,
    /// Settlement that failed and awaits retry or reconciliation.
    pub pending_settlement: Option<SettlementPlan>,
    pub reconciliation_note: Option<String>,
}

impl Validation {
    pub fn new(
        id: ValidationId,
        entity_id: EntityId,
        config: EntityTypeConfig,
        ai_pre_score: Option<u8>,
        assigned: Vec<Assignment>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            entity_id,
            sector_id: config.sector_id.clone(),
            entity_type: config.entity_type,
            config,
            ai_pre_score,
            assigned,
            votes: BTreeMap::new(),
            status: ValidationStatus::Pending,
            outcome: None,
            original_outcome: None,
            timed_out: false,
            created_at,
            resolved_at: None,
            pending_settlement: None,
            reconciliation_note: None,
        }
    }

    pub fn assignment(&self, validator: &Address) -> Option<&Assignment> {
        self.assigned.iter().find(|a| &a.validator == validator)
    }

    pub fn is_assigned(&self, validator: &Address) -> bool {
        self.assignment(validator).is_some()
    }

    pub fn total_assigned_weight(&self) -> u128 {
        self.assigned.iter().map(|a| a.weight).sum()
    }

    pub fn all_voted(&self) -> bool {
        self.votes.len() == self.assigned.len()
    }

    /// Assigned validators that never voted, in assignment order.
    pub fn non_voters(&self) -> impl Iterator<Item = &Address> {
        self.assigned
            .iter()
            .map(|a| &a.validator)
            .filter(|v| !self.votes.contains_key(*v))
    }

    /// Whether the advisory pre-score cleared the snapshot's quality bar.
    pub fn pre_score_passes(&self) -> Option<bool> {
        self.ai_pre_score
            .map(|score| self.config.pre_score_meets_threshold(score))
    }
}
