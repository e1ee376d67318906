use crate::state::{Outcome, Validation, ValidationStatus};
use oracle_types::{SectorId, BPS_DENOMINATOR};
use serde::{Deserialize, Serialize};

/// Per-sector counts over every validation the oracle holds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorStats {
    pub sector: SectorId,
    pub pending: u64,
    pub finalized: u64,
    /// Decided outcomes, counting the current outcome after any dispute.
    pub approved: u64,
    pub rejected: u64,
    pub timed_out: u64,
    pub disputed: u64,
    pub settlement_failed: u64,
    /// Approved share of decided validations.
    pub approval_rate_bps: u32,
    /// Mean of `resolved_at - created_at` over decided validations.
    pub avg_resolution_secs: u64,
}

impl SectorStats {
    pub fn compute<'a>(sector: SectorId, validations: impl IntoIterator<Item = &'a Validation>) -> Self {
        let mut stats = Self {
            sector,
            ..Self::default()
        };
        let mut decided = 0u64;
        let mut resolution_total = 0u64;

        for v in validations {
            match v.status {
                ValidationStatus::Pending => stats.pending += 1,
                ValidationStatus::Finalized => stats.finalized += 1,
                ValidationStatus::Disputed => stats.disputed += 1,
                ValidationStatus::SettlementFailed => stats.settlement_failed += 1,
                ValidationStatus::Approved | ValidationStatus::Rejected | ValidationStatus::TimedOut => {}
            }
            if v.timed_out {
                stats.timed_out += 1;
            }
            match v.outcome {
                Some(Outcome::Approved) => stats.approved += 1,
                Some(Outcome::Rejected) => stats.rejected += 1,
                None => {}
            }
            if let Some(resolved_at) = v.resolved_at {
                decided += 1;
                resolution_total += v.created_at.elapsed_since(resolved_at);
            }
        }

        if decided > 0 {
            stats.avg_resolution_secs = resolution_total / decided;
            stats.approval_rate_bps = (stats.approved as u128 * BPS_DENOMINATOR / decided as u128) as u32;
        }
        stats
    }
}
