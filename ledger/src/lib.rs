//! Token ledger port for the Quality Oracle.
//!
//! The oracle never moves tokens itself. Stake escrow, release, slashing and
//! fee payouts go through the [`TokenLedger`] trait, and every call carries an
//! [`IdempotencyKey`] derived from the validation and settlement step, so
//! re-running a settlement after a crash or a failed call never pays twice.

pub mod error;
pub mod key;
pub mod memory;

pub use error::LedgerError;
pub use key::IdempotencyKey;
pub use memory::{AccountBalance, InMemoryLedger, LedgerOp, LedgerSnapshot, Receipt};

use oracle_types::Address;

/// Token movements the oracle needs from the underlying ledger.
///
/// Implementations must be idempotent per key: a repeated call with a key
/// that already succeeded returns the original result without moving funds.
pub trait TokenLedger: Send + Sync {
    /// Lock `amount` of `account`'s free balance.
    fn escrow_stake(&self, key: &IdempotencyKey, account: &Address, amount: u128) -> Result<(), LedgerError>;

    /// Return `amount` of escrowed funds to `account`'s free balance.
    fn release_stake(&self, key: &IdempotencyKey, account: &Address, amount: u128) -> Result<(), LedgerError>;

    /// Confiscate up to `amount` of `account`'s escrow. Returns the amount taken.
    fn slash(&self, key: &IdempotencyKey, account: &Address, amount: u128) -> Result<u128, LedgerError>;

    /// Credit `amount` to `account` from the fee pool.
    fn pay_fee(&self, key: &IdempotencyKey, account: &Address, amount: u128) -> Result<(), LedgerError>;
}
