//! Validator record and reputation-weighted voting power.

use oracle_types::{mul_div, Address, SectorId, Timestamp, BPS_DENOMINATOR};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Reputation multiplier at zero accuracy (0.5×).
pub const MIN_MULTIPLIER_BPS: u32 = 5_000;

/// Reputation multiplier at full accuracy (1.5×).
pub const MAX_MULTIPLIER_BPS: u32 = 15_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidatorStatus {
    /// Eligible for assignment.
    Active,
    /// Removed from assignment by an operator; stake untouched.
    Suspended,
    /// Lost stake after voting with an outcome overturned on dispute.
    Slashed,
}

impl fmt::Display for ValidatorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Slashed => "slashed",
        };
        f.write_str(s)
    }
}

/// A staked participant that votes on validations in its sectors.
///
/// Records are never deleted; a validator leaves the pool through its status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    pub address: Address,
    pub staked_amount: u128,
    pub sectors: BTreeSet<SectorId>,
    /// Historical correctness, 0..=10_000 (10_000 = always agreed with the outcome).
    pub accuracy_bps: u32,
    pub status: ValidatorStatus,
    pub joined_at: Timestamp,
}

impl Validator {
    /// Accuracy on the 0–100 scale.
    pub fn accuracy(&self) -> u8 {
        (self.accuracy_bps / 100).min(100) as u8
    }

    pub fn is_active(&self) -> bool {
        self.status == ValidatorStatus::Active
    }

    pub fn serves(&self, sector: &SectorId) -> bool {
        self.sectors.contains(sector)
    }

    /// Multiplier applied to stake, linear in accuracy: 0 → 0.5×, 50 → 1.0×, 100 → 1.5×.
    pub fn reputation_multiplier_bps(&self) -> u32 {
        (MIN_MULTIPLIER_BPS + self.accuracy_bps.min(10_000)).min(MAX_MULTIPLIER_BPS)
    }

    /// Current voting power: stake scaled by the reputation multiplier.
    pub fn vote_weight(&self) -> u128 {
        mul_div(
            self.staked_amount,
            self.reputation_multiplier_bps() as u128,
            BPS_DENOMINATOR,
        )
    }
}
