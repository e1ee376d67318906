use crate::state::ValidationStatus;
use oracle_ledger::LedgerError;
use oracle_sectors::SectorError;
use oracle_types::{Address, DisputeId, EntityId, EntityType, SectorId, Timestamp, ValidationId};
use oracle_validators::RegistryError;
use thiserror::Error;

/// How a caller should treat an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected by policy; resubmitting the same input fails again.
    Policy,
    /// Lost a race or violated a one-shot rule; retry only with different input.
    Conflict,
    /// Not enough validators right now; may succeed later.
    Resource,
    /// A ledger call failed; needs operator reconciliation.
    Settlement,
    NotFound,
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("entity type {entity_type} is disabled in sector {sector}")]
    SectorDisabled {
        sector: SectorId,
        entity_type: EntityType,
    },

    #[error("intake is paused for sector {0}")]
    IntakePaused(SectorId),

    #[error("pre-score must be 0..=100, got {0}")]
    InvalidPreScore(u8),

    #[error("invalid address: {0:?}")]
    InvalidAddress(Address),

    #[error("invalid engine parameters: {0}")]
    InvalidParams(String),

    #[error("entity {entity} in sector {sector} already has validation {existing}")]
    EntityAlreadySubmitted {
        sector: SectorId,
        entity: EntityId,
        existing: ValidationId,
    },

    #[error("insufficient validators in sector {sector}: needed {needed}, available {available}")]
    InsufficientValidators {
        sector: SectorId,
        needed: usize,
        available: usize,
    },

    #[error("validator {validator} is not assigned to {validation}")]
    NotAssigned {
        validation: ValidationId,
        validator: Address,
    },

    #[error("validator {validator} has already voted on {validation}")]
    AlreadyVoted {
        validation: ValidationId,
        validator: Address,
    },

    #[error("validation {validation} is not open for votes (status {status:?})")]
    ValidationNotOpen {
        validation: ValidationId,
        status: ValidationStatus,
    },

    #[error("validation {0} already has an active dispute")]
    DisputeAlreadyOpen(ValidationId),

    #[error("validation {validation} is not finalized (status {status:?})")]
    NotFinalized {
        validation: ValidationId,
        status: ValidationStatus,
    },

    #[error("validation {0} has an unreconciled settlement failure")]
    SettlementUnreconciled(ValidationId),

    #[error("validation {0} has no failed settlement to recover")]
    NoFailedSettlement(ValidationId),

    #[error("dispute window for {validation} closed: resolved at {resolved_at}, now {now}")]
    WindowExpired {
        validation: ValidationId,
        resolved_at: Timestamp,
        now: Timestamp,
    },

    #[error("insufficient collateral: needed {needed}, provided {provided}")]
    InsufficientCollateral { needed: u128, provided: u128 },

    #[error("{0} is not an authorized arbitrator")]
    Unauthorized(Address),

    #[error("dispute {0} is already resolved")]
    DisputeNotActive(DisputeId),

    #[error("validation {0} not found")]
    ValidationNotFound(ValidationId),

    #[error("dispute {0} not found")]
    DisputeNotFound(DisputeId),

    #[error(transparent)]
    Sector(#[from] SectorError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SectorDisabled { .. }
            | Self::IntakePaused(_)
            | Self::InvalidPreScore(_)
            | Self::InvalidAddress(_)
            | Self::InvalidParams(_)
            | Self::WindowExpired { .. }
            | Self::InsufficientCollateral { .. }
            | Self::Unauthorized(_) => ErrorKind::Policy,

            Self::EntityAlreadySubmitted { .. }
            | Self::NotAssigned { .. }
            | Self::AlreadyVoted { .. }
            | Self::ValidationNotOpen { .. }
            | Self::DisputeAlreadyOpen(_)
            | Self::NotFinalized { .. }
            | Self::SettlementUnreconciled(_)
            | Self::NoFailedSettlement(_)
            | Self::DisputeNotActive(_) => ErrorKind::Conflict,

            Self::InsufficientValidators { .. } => ErrorKind::Resource,

            Self::ValidationNotFound(_) | Self::DisputeNotFound(_) => ErrorKind::NotFound,

            Self::Sector(e) => sector_kind(e),
            Self::Registry(e) => match e {
                RegistryError::NotFound(_) => ErrorKind::NotFound,
                RegistryError::AlreadyRegistered(_) => ErrorKind::Conflict,
                RegistryError::CorruptJournal { .. } => ErrorKind::Settlement,
                RegistryError::Sector(e) => sector_kind(e),
                RegistryError::InvalidAddress(_)
                | RegistryError::NoSectors
                | RegistryError::InsufficientStake { .. }
                | RegistryError::StakeWouldGoNegative { .. } => ErrorKind::Policy,
            },
            Self::Ledger(_) => ErrorKind::Settlement,
        }
    }
}

fn sector_kind(e: &SectorError) -> ErrorKind {
    match e {
        SectorError::InvalidConfig(_) => ErrorKind::Policy,
        SectorError::UnknownSector(_) | SectorError::ConfigNotFound { .. } => ErrorKind::NotFound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_follows_taxonomy() {
        let sector = SectorId::from("market");
        assert_eq!(ValidationError::IntakePaused(sector.clone()).kind(), ErrorKind::Policy);
        assert_eq!(
            ValidationError::AlreadyVoted {
                validation: ValidationId::new(1),
                validator: Address::from("a"),
            }
            .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            ValidationError::InsufficientValidators {
                sector: sector.clone(),
                needed: 5,
                available: 2,
            }
            .kind(),
            ErrorKind::Resource
        );
        assert_eq!(
            ValidationError::from(LedgerError::Unavailable("down".into())).kind(),
            ErrorKind::Settlement
        );
        assert_eq!(
            ValidationError::from(RegistryError::InsufficientStake {
                sector,
                needed: 10,
                provided: 1,
            })
            .kind(),
            ErrorKind::Policy
        );
        assert_eq!(
            ValidationError::from(SectorError::InvalidConfig("quorum".into())).kind(),
            ErrorKind::Policy
        );
    }
}
