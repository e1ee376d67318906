//! Sector-wide policy that is not specific to an entity type.

use oracle_types::SectorId;
use serde::{Deserialize, Serialize};

/// Sector membership requirements for validators.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorPolicy {
    pub sector_id: SectorId,
    /// Human-readable sector name shown to operators.
    #[serde(default)]
    pub name: String,
    /// Minimum stake a validator must hold to serve in this sector.
    pub min_validator_stake: u128,
}

impl SectorPolicy {
    pub fn new(sector_id: impl Into<String>, min_validator_stake: u128) -> Self {
        let id = sector_id.into();
        Self {
            name: id.clone(),
            sector_id: SectorId::new(id),
            min_validator_stake,
        }
    }
}
