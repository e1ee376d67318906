use oracle_types::{EntityType, SectorId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SectorError {
    #[error("sector {0} is not defined")]
    UnknownSector(SectorId),

    #[error("no configuration for entity type {entity_type} in sector {sector}")]
    ConfigNotFound {
        sector: SectorId,
        entity_type: EntityType,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
