//! Advisory pre-score intake.
//!
//! A submission may carry its own pre-score; otherwise an optional provider
//! is asked. Either way the score is informational and never decides.

use crate::error::ValidationError;
use oracle_types::{EntityId, EntityType, PreScoreProvider, SectorId, MAX_PRE_SCORE};

/// Settle the pre-score recorded on a new validation.
///
/// A caller-supplied score out of range is rejected. A provider score out of
/// range is dropped with a warning, since the provider is not the caller.
pub fn resolve_pre_score(
    supplied: Option<u8>,
    provider: Option<&dyn PreScoreProvider>,
    entity: &EntityId,
    sector: &SectorId,
    entity_type: EntityType,
) -> Result<Option<u8>, ValidationError> {
    if let Some(score) = supplied {
        if score > MAX_PRE_SCORE {
            return Err(ValidationError::InvalidPreScore(score));
        }
        return Ok(Some(score));
    }
    let Some(provider) = provider else {
        return Ok(None);
    };
    match provider.score(entity, sector, entity_type) {
        Some(score) if score > MAX_PRE_SCORE => {
            tracing::warn!(provider = provider.name(), %entity, score, "pre-score out of range, ignored");
            Ok(None)
        }
        score => Ok(score),
    }
}
