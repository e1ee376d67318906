//! Per-(sector, entity type) validation policy.

use crate::error::SectorError;
use oracle_types::{EntityType, SectorId, SECS_PER_DAY};
use serde::{Deserialize, Serialize};

/// Smallest quorum the engine accepts.
pub const MIN_QUORUM_SIZE: u32 = 3;

/// Default voting window: 48 hours.
pub const DEFAULT_VOTING_WINDOW_SECS: u64 = 2 * SECS_PER_DAY;

/// Default dispute window: 7 days after resolution.
pub const DEFAULT_DISPUTE_TIMEOUT_DAYS: u32 = 7;

/// Immutable validation policy for one entity type within one sector.
///
/// A validation copies the config it was submitted under; later updates
/// publish a new `version` and leave that copy untouched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTypeConfig {
    pub sector_id: SectorId,
    pub entity_type: EntityType,
    /// Quality bar on the 0–100 scale the pre-score is reported on.
    pub quality_threshold: u8,
    /// Minimum stake a challenger must lock to dispute a resolution.
    pub required_collateral: u128,
    /// Fee pool distributed to validators who voted with the outcome.
    pub validation_fee: u128,
    /// Number of validators assigned to each validation. Always odd and ≥ 3.
    pub quorum_size: u32,
    /// Days after resolution during which a dispute may be raised.
    pub dispute_timeout_days: u32,
    /// Seconds validators have to vote before the validation times out.
    #[serde(default = "default_voting_window_secs")]
    pub voting_window_secs: u64,
    #[serde(default = "default_true")]
    pub active: bool,
    /// Assigned by the store on publish; any caller-supplied value is replaced.
    #[serde(default)]
    pub version: u32,
}

fn default_voting_window_secs() -> u64 {
    DEFAULT_VOTING_WINDOW_SECS
}

fn default_true() -> bool {
    true
}

impl EntityTypeConfig {
    /// Default policy table for an entity category.
    ///
    /// Riskier categories (real-world assets, logistics) carry a higher bar,
    /// more collateral and a larger fee than lightweight ones (posts).
    pub fn defaults_for(sector_id: SectorId, entity_type: EntityType) -> Self {
        let (quality_threshold, required_collateral, validation_fee) = match entity_type {
            EntityType::Product => (70, 100, 5),
            EntityType::Service => (75, 150, 8),
            EntityType::Nft => (60, 200, 10),
            EntityType::Rwa => (85, 500, 25),
            EntityType::Logistics => (80, 250, 12),
            EntityType::Post => (50, 20, 1),
        };
        Self {
            sector_id,
            entity_type,
            quality_threshold,
            required_collateral,
            validation_fee,
            quorum_size: 5,
            dispute_timeout_days: DEFAULT_DISPUTE_TIMEOUT_DAYS,
            voting_window_secs: DEFAULT_VOTING_WINDOW_SECS,
            active: true,
            version: 0,
        }
    }

    /// Length of the dispute window in seconds.
    pub fn dispute_window_secs(&self) -> u64 {
        self.dispute_timeout_days as u64 * SECS_PER_DAY
    }

    /// Whether an advisory pre-score clears this config's quality bar.
    pub fn pre_score_meets_threshold(&self, pre_score: u8) -> bool {
        pre_score >= self.quality_threshold
    }

    pub fn validate(&self) -> Result<(), SectorError> {
        if self.quality_threshold > 100 {
            return Err(SectorError::InvalidConfig(format!(
                "quality_threshold must be 0..=100, got {}",
                self.quality_threshold
            )));
        }
        if self.quorum_size < MIN_QUORUM_SIZE {
            return Err(SectorError::InvalidConfig(format!(
                "quorum_size must be at least {MIN_QUORUM_SIZE}, got {}",
                self.quorum_size
            )));
        }
        if self.quorum_size % 2 == 0 {
            return Err(SectorError::InvalidConfig(format!(
                "quorum_size must be odd, got {}",
                self.quorum_size
            )));
        }
        if self.dispute_timeout_days < 1 {
            return Err(SectorError::InvalidConfig(
                "dispute_timeout_days must be at least 1".into(),
            ));
        }
        if self.voting_window_secs == 0 || self.voting_window_secs >= self.dispute_window_secs() {
            return Err(SectorError::InvalidConfig(format!(
                "voting_window_secs must be in 1..{}, got {}",
                self.dispute_window_secs(),
                self.voting_window_secs
            )));
        }
        Ok(())
    }
}
