//! Lifecycle transitions of a validation.
//!
//! ```text
//! Pending ──vote──▶ Approved | Rejected ──settle──▶ Finalized
//! Pending ──timeout──▶ TimedOut ──settle──▶ Finalized (Rejected)
//! Finalized ──dispute──▶ Disputed ──resolve──▶ Finalized (outcome may flip)
//! any settling state ──ledger failure──▶ SettlementFailed ──retry | reconcile──▶ Finalized
//! ```
//!
//! Callers hold the validation's mutex across a transition, so the
//! `Pending` check below is the compare-and-set that admits exactly one
//! decision per validation.

use crate::settlement::SettlementPlan;
use crate::state::{Outcome, Validation, ValidationStatus};
use oracle_types::Timestamp;

pub struct QuorumResolver;

impl QuorumResolver {
    /// Take the decision transition out of `Pending`.
    ///
    /// Returns `false` without touching the validation if it was already decided.
    pub fn conclude(validation: &mut Validation, outcome: Outcome, timed_out: bool, now: Timestamp) -> bool {
        if !validation.status.is_pending() {
            return false;
        }
        validation.status = match (timed_out, outcome) {
            (true, _) => ValidationStatus::TimedOut,
            (false, Outcome::Approved) => ValidationStatus::Approved,
            (false, Outcome::Rejected) => ValidationStatus::Rejected,
        };
        validation.outcome = Some(outcome);
        validation.timed_out = timed_out;
        validation.resolved_at = Some(now);
        tracing::info!(
            validation = %validation.id,
            sector = %validation.sector_id,
            %outcome,
            timed_out,
            votes = validation.votes.len(),
            "validation decided"
        );
        true
    }

    /// Whether a pending validation's voting window has elapsed.
    pub fn voting_expired(validation: &Validation, now: Timestamp) -> bool {
        validation.status.is_pending()
            && validation
                .created_at
                .window_elapsed(validation.config.voting_window_secs, now)
    }

    /// Decide an expired validation as Rejected. No-op otherwise.
    pub fn check_timeout(validation: &mut Validation, now: Timestamp) -> bool {
        Self::voting_expired(validation, now)
            && Self::conclude(validation, Outcome::Rejected, true, now)
    }

    /// Record that settlement completed.
    pub fn mark_settled(validation: &mut Validation) {
        validation.status = ValidationStatus::Finalized;
        validation.pending_settlement = None;
    }

    /// Park a validation whose settlement failed, keeping the plan for recovery.
    pub fn mark_settlement_failed(validation: &mut Validation, plan: SettlementPlan) {
        validation.status = ValidationStatus::SettlementFailed;
        validation.pending_settlement = Some(plan);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Assignment;
    use oracle_sectors::EntityTypeConfig;
    use oracle_types::{Address, EntityId, EntityType, SectorId, ValidationId};

    fn validation(voting_window_secs: u64) -> Validation {
        let config = EntityTypeConfig {
            voting_window_secs,
            ..EntityTypeConfig::defaults_for(SectorId::from("market"), EntityType::Service)
        };
        Validation::new(
            ValidationId::new(3),
            EntityId::from("svc"),
            config,
            None,
            vec![Assignment {
                validator: Address::from("a"),
                weight: 1,
            }],
            Timestamp::new(1_000),
        )
    }

    #[test]
    fn second_conclusion_is_a_no_op() {
        let mut v = validation(60);
        assert!(QuorumResolver::conclude(&mut v, Outcome::Approved, false, Timestamp::new(1_010)));
        assert!(!QuorumResolver::conclude(&mut v, Outcome::Rejected, false, Timestamp::new(1_020)));
        assert_eq!(v.outcome, Some(Outcome::Approved));
        assert_eq!(v.status, ValidationStatus::Approved);
        assert_eq!(v.resolved_at, Some(Timestamp::new(1_010)));
    }

    #[test]
    fn timeout_fires_only_after_window_and_only_once() {
        let mut v = validation(60);
        assert!(!QuorumResolver::check_timeout(&mut v, Timestamp::new(1_060)));
        assert!(QuorumResolver::check_timeout(&mut v, Timestamp::new(1_061)));
        assert_eq!(v.status, ValidationStatus::TimedOut);
        assert_eq!(v.outcome, Some(Outcome::Rejected));
        assert!(v.timed_out);
        assert!(!QuorumResolver::check_timeout(&mut v, Timestamp::new(2_000)));
    }

    #[test]
    fn decided_validation_never_times_out() {
        let mut v = validation(60);
        QuorumResolver::conclude(&mut v, Outcome::Approved, false, Timestamp::new(1_001));
        QuorumResolver::mark_settled(&mut v);
        assert!(!QuorumResolver::check_timeout(&mut v, Timestamp::new(9_999)));
        assert_eq!(v.status, ValidationStatus::Finalized);
    }
}
