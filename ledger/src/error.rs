use crate::key::IdempotencyKey;
use oracle_types::Address;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("insufficient funds for {account}: available {available}, requested {requested}")]
    InsufficientFunds {
        account: Address,
        available: u128,
        requested: u128,
    },

    #[error("insufficient escrow for {account}: escrowed {escrowed}, requested {requested}")]
    InsufficientEscrow {
        account: Address,
        escrowed: u128,
        requested: u128,
    },

    #[error("idempotency key {0} was already used for a different operation")]
    KeyConflict(IdempotencyKey),

    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}
