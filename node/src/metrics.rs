//! Prometheus metrics for the oracle node.
//!
//! Counters are fed from drained [`OracleEvent`]s, so the engine itself
//! carries no metrics dependency. [`OracleMetrics`] owns a dedicated
//! [`Registry`] that can be encoded into the text exposition format.

use oracle_validation::OracleEvent;
use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, IntCounter,
    IntGauge, Opts, Registry, TextEncoder,
};

use crate::NodeError;

pub struct OracleMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    pub submissions: IntCounter,
    pub votes: IntCounter,
    /// Settlements that completed, including dispute and retry settlements.
    pub finalizations: IntCounter,
    pub timeouts: IntCounter,
    pub disputes_raised: IntCounter,
    pub disputes_resolved: IntCounter,
    pub settlement_failures: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub pending_validations: IntGauge,
}

impl OracleMetrics {
    pub fn new() -> Result<Self, NodeError> {
        let registry = Registry::new();

        let submissions = register_int_counter_with_registry!(
            Opts::new("oracle_submissions_total", "Entities accepted for validation"),
            registry
        )?;
        let votes = register_int_counter_with_registry!(
            Opts::new("oracle_votes_total", "Votes recorded"),
            registry
        )?;
        let finalizations = register_int_counter_with_registry!(
            Opts::new("oracle_finalizations_total", "Settlements completed"),
            registry
        )?;
        let timeouts = register_int_counter_with_registry!(
            Opts::new(
                "oracle_timeouts_total",
                "Validations rejected because the voting window elapsed"
            ),
            registry
        )?;
        let disputes_raised = register_int_counter_with_registry!(
            Opts::new("oracle_disputes_raised_total", "Disputes raised"),
            registry
        )?;
        let disputes_resolved = register_int_counter_with_registry!(
            Opts::new("oracle_disputes_resolved_total", "Disputes resolved"),
            registry
        )?;
        let settlement_failures = register_int_counter_with_registry!(
            Opts::new(
                "oracle_settlement_failures_total",
                "Settlements parked after a ledger failure"
            ),
            registry
        )?;
        let pending_validations = register_int_gauge_with_registry!(
            Opts::new("oracle_pending_validations", "Validations collecting votes"),
            registry
        )?;

        Ok(Self {
            registry,
            submissions,
            votes,
            finalizations,
            timeouts,
            disputes_raised,
            disputes_resolved,
            settlement_failures,
            pending_validations,
        })
    }

    /// Count a batch of drained events.
    pub fn observe(&self, events: &[OracleEvent]) {
        for event in events {
            match event {
                OracleEvent::EntitySubmitted { .. } => self.submissions.inc(),
                OracleEvent::VoteCast { .. } => self.votes.inc(),
                OracleEvent::ValidationDecided { timed_out: true, .. } => self.timeouts.inc(),
                OracleEvent::ValidationFinalized { .. } => self.finalizations.inc(),
                OracleEvent::SettlementFailed { .. } => self.settlement_failures.inc(),
                OracleEvent::DisputeRaised { .. } => self.disputes_raised.inc(),
                OracleEvent::DisputeResolved { .. } => self.disputes_resolved.inc(),
                _ => {}
            }
        }
    }

    pub fn set_pending(&self, pending: u64) {
        self.pending_validations.set(pending as i64);
    }

    /// Encode every metric in the Prometheus text format.
    pub fn encode(&self) -> Result<String, NodeError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| NodeError::Task(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oracle_types::{Address, ValidationId};
    use oracle_validation::{Outcome, VoteChoice};

    #[test]
    fn events_drive_counters() {
        let metrics = OracleMetrics::new().unwrap();
        let id = ValidationId::new(1);
        metrics.observe(&[
            OracleEvent::VoteCast {
                validation: id,
                validator: Address::from("a"),
                choice: VoteChoice::Approve,
                weight: 1,
            },
            OracleEvent::ValidationDecided {
                validation: id,
                outcome: Outcome::Rejected,
                timed_out: true,
            },
            OracleEvent::ValidationDecided {
                validation: ValidationId::new(2),
                outcome: Outcome::Approved,
                timed_out: false,
            },
        ]);
        metrics.set_pending(4);

        assert_eq!(metrics.votes.get(), 1);
        assert_eq!(metrics.timeouts.get(), 1);
        assert_eq!(metrics.pending_validations.get(), 4);
        let text = metrics.encode().unwrap();
        assert!(text.contains("oracle_timeouts_total 1"));
    }
}
