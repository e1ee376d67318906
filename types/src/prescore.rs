//! Advisory quality pre-score port.

use crate::ids::{EntityId, EntityType, SectorId};

/// Highest pre-score a provider may report.
pub const MAX_PRE_SCORE: u8 = 100;

/// Source of an advisory 0–100 quality score for a submitted entity.
///
/// The score is recorded on the validation for voters to consult. It never
/// decides an outcome; only the validator quorum does.
pub trait PreScoreProvider: Send + Sync {
    /// Human-readable name of the scoring source.
    fn name(&self) -> &str;

    /// Score an entity, or `None` if the provider has no opinion.
    fn score(&self, entity: &EntityId, sector: &SectorId, entity_type: EntityType) -> Option<u8>;
}
