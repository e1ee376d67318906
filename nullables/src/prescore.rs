//! Nullable pre-score provider: a fixed answer for every entity.

use oracle_types::{EntityId, EntityType, PreScoreProvider, SectorId};

#[derive(Clone, Copy, Debug, Default)]
pub struct FixedPreScore {
    score: Option<u8>,
}

impl FixedPreScore {
    pub fn new(score: u8) -> Self {
        Self { score: Some(score) }
    }

    /// A provider that never has an opinion.
    pub fn silent() -> Self {
        Self { score: None }
    }
}

impl PreScoreProvider for FixedPreScore {
    fn name(&self) -> &str {
        "fixed"
    }

    fn score(&self, _entity: &EntityId, _sector: &SectorId, _entity_type: EntityType) -> Option<u8> {
        self.score
    }
}
