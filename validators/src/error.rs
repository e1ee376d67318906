use oracle_sectors::SectorError;
use oracle_types::{Address, SectorId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid validator address: {0:?}")]
    InvalidAddress(Address),

    #[error("validator {0} is already registered")]
    AlreadyRegistered(Address),

    #[error("validator {0} not found")]
    NotFound(Address),

    #[error("a validator must serve at least one sector")]
    NoSectors,

    #[error("insufficient stake for sector {sector}: needed {needed}, provided {provided}")]
    InsufficientStake {
        sector: SectorId,
        needed: u128,
        provided: u128,
    },

    #[error("stake of {address} would go negative: stake {stake}, decrease {requested}")]
    StakeWouldGoNegative {
        address: Address,
        stake: u128,
        requested: u128,
    },

    #[error("journal entry {seq} cannot be applied: {reason}")]
    CorruptJournal { seq: u64, reason: String },

    #[error(transparent)]
    Sector(#[from] SectorError),
}
