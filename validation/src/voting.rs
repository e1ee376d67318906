//! Weighted voting: one vote per assigned validator, tallied by weight.

use crate::error::ValidationError;
use crate::state::{Outcome, Validation, Vote, VoteChoice};
use oracle_types::{Address, Timestamp, BPS_DENOMINATOR};

/// Running weighted tally of a validation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    pub approve: u128,
    pub reject: u128,
    /// Sum of assigned weights, fixed at assignment.
    pub total: u128,
}

impl Tally {
    pub fn of(validation: &Validation) -> Self {
        let mut tally = Self {
            total: validation.total_assigned_weight(),
            ..Self::default()
        };
        for vote in validation.votes.values() {
            match vote.choice {
                VoteChoice::Approve => tally.approve += vote.weight,
                VoteChoice::Reject => tally.reject += vote.weight,
            }
        }
        tally
    }

    pub fn cast(&self) -> u128 {
        self.approve + self.reject
    }
}

/// What a recorded vote did to the validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteDecision {
    /// Recorded; no side has won yet.
    Open,
    /// This vote decided the validation.
    Decided(Outcome),
}

/// Records votes and decides when a side has won.
///
/// Does not change the validation's status; the resolver performs the
/// single decision transition.
#[derive(Clone, Copy, Debug)]
pub struct WeightedVotingEngine {
    /// Margin above one half a side needs to win before everyone has voted.
    pub epsilon_bps: u32,
}

impl WeightedVotingEngine {
    pub fn new(epsilon_bps: u32) -> Self {
        Self { epsilon_bps }
    }

    /// Record `validator`'s vote with its current weight, capped at the weight
    /// it was assigned with.
    pub fn cast_vote(
        &self,
        validation: &mut Validation,
        validator: &Address,
        current_weight: u128,
        choice: VoteChoice,
        reason: impl Into<String>,
        now: Timestamp,
    ) -> Result<VoteDecision, ValidationError> {
        let assigned_weight = validation
            .assignment(validator)
            .map(|a| a.weight)
            .ok_or_else(|| ValidationError::NotAssigned {
                validation: validation.id,
                validator: validator.clone(),
            })?;
        if validation.votes.contains_key(validator) {
            return Err(ValidationError::AlreadyVoted {
                validation: validation.id,
                validator: validator.clone(),
            });
        }
        if !validation.status.is_pending() {
            return Err(ValidationError::ValidationNotOpen {
                validation: validation.id,
                status: validation.status,
            });
        }

        validation.votes.insert(
            validator.clone(),
            Vote {
                validator: validator.clone(),
                choice,
                weight: current_weight.min(assigned_weight),
                reason: reason.into(),
                cast_at: now,
            },
        );

        Ok(match self.evaluate(&Tally::of(validation), validation.all_voted()) {
            Some(outcome) => VoteDecision::Decided(outcome),
            None => VoteDecision::Open,
        })
    }

    /// Decide from a tally.
    ///
    /// A side wins early once it holds at least `1/2 + epsilon` of the total
    /// assigned weight. With every vote in and no early winner, Approve needs
    /// strictly more weight than Reject; a tie is Rejected.
    pub fn evaluate(&self, tally: &Tally, all_voted: bool) -> Option<Outcome> {
        if tally.total > 0 {
            let bar = tally
                .total
                .saturating_mul(5_000 + self.epsilon_bps as u128);
            if tally.approve.saturating_mul(BPS_DENOMINATOR) >= bar {
                return Some(Outcome::Approved);
            }
            if tally.reject.saturating_mul(BPS_DENOMINATOR) >= bar {
                return Some(Outcome::Rejected);
            }
        }
        if all_voted {
            return Some(if tally.approve > tally.reject {
                Outcome::Approved
            } else {
                Outcome::Rejected
            });
        }
        None
    }
}
