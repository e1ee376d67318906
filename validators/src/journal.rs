//! Append-only record of registry mutations.
//!
//! The registry applies every change through the same path it uses to replay
//! a journal, so a replayed registry is identical to the one that wrote it.

use crate::validator::ValidatorStatus;
use oracle_types::{Address, SectorId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StakeDelta {
    Increase(u128),
    Decrease(u128),
}

impl StakeDelta {
    pub fn amount(&self) -> u128 {
        match self {
            Self::Increase(a) | Self::Decrease(a) => *a,
        }
    }
}

/// Why a validator's stake changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StakeReason {
    Deposit,
    Withdrawal,
    Slash,
}

impl fmt::Display for StakeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::Slash => "slash",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryChange {
    Registered {
        stake: u128,
        sectors: Vec<SectorId>,
        accuracy_bps: u32,
    },
    Stake {
        delta: StakeDelta,
        reason: StakeReason,
    },
    Status {
        from: ValidatorStatus,
        to: ValidatorStatus,
    },
    Accuracy {
        from_bps: u32,
        to_bps: u32,
    },
}

/// One journal line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Position in the journal, starting at 0 with no gaps.
    pub seq: u64,
    pub address: Address,
    pub change: RegistryChange,
    pub at: Timestamp,
}
