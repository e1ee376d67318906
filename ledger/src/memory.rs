//! In-process ledger backend.
//!
//! Keeps free and escrowed balances per account, a pool of confiscated funds
//! and one receipt per idempotency key. Used by the daemon when no external
//! ledger is attached, and by tests that assert on balances.

use crate::error::LedgerError;
use crate::key::IdempotencyKey;
use crate::TokenLedger;
use oracle_types::Address;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub available: u128,
    pub escrowed: u128,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerOp {
    Escrow,
    Release,
    Slash,
    PayFee,
}

/// Outcome of an applied operation, replayed on key reuse.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub op: LedgerOp,
    pub account: Address,
    pub requested: u128,
    /// Amount actually moved (differs from `requested` only for capped slashes).
    pub moved: u128,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub accounts: BTreeMap<Address, AccountBalance>,
    pub receipts: BTreeMap<IdempotencyKey, Receipt>,
    pub slashed_pool: u128,
    pub fees_paid: u128,
}

/// Idempotent in-memory [`TokenLedger`].
#[derive(Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerSnapshot>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn restore(snapshot: LedgerSnapshot) -> Self {
        Self {
            state: Mutex::new(snapshot),
        }
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.state.lock().clone()
    }

    /// Credit free balance from outside the oracle (deposits).
    pub fn fund(&self, account: &Address, amount: u128) {
        let mut state = self.state.lock();
        let balance = state.accounts.entry(account.clone()).or_default();
        balance.available = balance.available.saturating_add(amount);
    }

    pub fn balance(&self, account: &Address) -> AccountBalance {
        self.state
            .lock()
            .accounts
            .get(account)
            .copied()
            .unwrap_or_default()
    }

    /// Total confiscated by slashes so far.
    pub fn slashed_pool(&self) -> u128 {
        self.state.lock().slashed_pool
    }

    /// Total paid out through [`TokenLedger::pay_fee`].
    pub fn fees_paid(&self) -> u128 {
        self.state.lock().fees_paid
    }

    pub fn receipt(&self, key: &IdempotencyKey) -> Option<Receipt> {
        self.state.lock().receipts.get(key).cloned()
    }

    fn execute(
        &self,
        key: &IdempotencyKey,
        op: LedgerOp,
        account: &Address,
        amount: u128,
    ) -> Result<u128, LedgerError> {
        let mut state = self.state.lock();
        if let Some(receipt) = state.receipts.get(key) {
            if receipt.op != op || &receipt.account != account || receipt.requested != amount {
                return Err(LedgerError::KeyConflict(key.clone()));
            }
            tracing::debug!(%key, "ledger call deduplicated");
            return Ok(receipt.moved);
        }

        let balance = state.accounts.get(account).copied().unwrap_or_default();
        let (next, moved) = match op {
            LedgerOp::Escrow => {
                if balance.available < amount {
                    return Err(LedgerError::InsufficientFunds {
                        account: account.clone(),
                        available: balance.available,
                        requested: amount,
                    });
                }
                let next = AccountBalance {
                    available: balance.available - amount,
                    escrowed: balance.escrowed + amount,
                };
                (next, amount)
            }
            LedgerOp::Release => {
                if balance.escrowed < amount {
                    return Err(LedgerError::InsufficientEscrow {
                        account: account.clone(),
                        escrowed: balance.escrowed,
                        requested: amount,
                    });
                }
                let next = AccountBalance {
                    available: balance.available + amount,
                    escrowed: balance.escrowed - amount,
                };
                (next, amount)
            }
            LedgerOp::Slash => {
                let taken = amount.min(balance.escrowed);
                let next = AccountBalance {
                    escrowed: balance.escrowed - taken,
                    ..balance
                };
                (next, taken)
            }
            LedgerOp::PayFee => {
                let next = AccountBalance {
                    available: balance.available.saturating_add(amount),
                    ..balance
                };
                (next, amount)
            }
        };

        state.accounts.insert(account.clone(), next);
        match op {
            LedgerOp::Slash => state.slashed_pool += moved,
            LedgerOp::PayFee => state.fees_paid += moved,
            LedgerOp::Escrow | LedgerOp::Release => {}
        }
        state.receipts.insert(
            key.clone(),
            Receipt {
                op,
                account: account.clone(),
                requested: amount,
                moved,
            },
        );
        tracing::debug!(%key, ?op, %account, amount, moved, "ledger call applied");
        Ok(moved)
    }
}

impl TokenLedger for InMemoryLedger {
    fn escrow_stake(&self, key: &IdempotencyKey, account: &Address, amount: u128) -> Result<(), LedgerError> {
        self.execute(key, LedgerOp::Escrow, account, amount).map(|_| ())
    }

    fn release_stake(&self, key: &IdempotencyKey, account: &Address, amount: u128) -> Result<(), LedgerError> {
        self.execute(key, LedgerOp::Release, account, amount).map(|_| ())
    }

    fn slash(&self, key: &IdempotencyKey, account: &Address, amount: u128) -> Result<u128, LedgerError> {
        self.execute(key, LedgerOp::Slash, account, amount)
    }

    fn pay_fee(&self, key: &IdempotencyKey, account: &Address, amount: u128) -> Result<(), LedgerError> {
        self.execute(key, LedgerOp::PayFee, account, amount).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Address {
        Address::from("alice")
    }

    fn key(s: &str) -> IdempotencyKey {
        IdempotencyKey::new(s)
    }

    #[test]
    fn escrow_requires_free_balance() {
        let ledger = InMemoryLedger::new();
        ledger.fund(&alice(), 50);
        let err = ledger.escrow_stake(&key("k1"), &alice(), 100).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { available: 50, .. }));
        assert!(ledger.receipt(&key("k1")).is_none());
    }

    #[test]
    fn escrow_release_moves_between_buckets() {
        let ledger = InMemoryLedger::new();
        ledger.fund(&alice(), 100);
        ledger.escrow_stake(&key("e"), &alice(), 80).unwrap();
        assert_eq!(
            ledger.balance(&alice()),
            AccountBalance {
                available: 20,
                escrowed: 80
            }
        );
        ledger.release_stake(&key("r"), &alice(), 30).unwrap();
        assert_eq!(
            ledger.balance(&alice()),
            AccountBalance {
                available: 50,
                escrowed: 50
            }
        );
    }

    #[test]
    fn repeated_key_is_applied_once() {
        let ledger = InMemoryLedger::new();
        ledger.pay_fee(&key("v1/finalize/fee/alice"), &alice(), 10).unwrap();
        ledger.pay_fee(&key("v1/finalize/fee/alice"), &alice(), 10).unwrap();
        assert_eq!(ledger.balance(&alice()).available, 10);
        assert_eq!(ledger.fees_paid(), 10);
    }

    #[test]
    fn reused_key_with_different_arguments_conflicts() {
        let ledger = InMemoryLedger::new();
        ledger.pay_fee(&key("k"), &alice(), 10).unwrap();
        assert!(matches!(
            ledger.pay_fee(&key("k"), &alice(), 11),
            Err(LedgerError::KeyConflict(_))
        ));
    }

    #[test]
    fn slash_is_capped_at_escrow_and_replays_actual_amount() {
        let ledger = InMemoryLedger::new();
        ledger.fund(&alice(), 100);
        ledger.escrow_stake(&key("e"), &alice(), 60).unwrap();
        assert_eq!(ledger.slash(&key("s"), &alice(), 500).unwrap(), 60);
        assert_eq!(ledger.slash(&key("s"), &alice(), 500).unwrap(), 60);
        assert_eq!(ledger.slashed_pool(), 60);
        assert_eq!(ledger.balance(&alice()).escrowed, 0);
    }

    #[test]
    fn snapshot_restore_keeps_receipts() {
        let ledger = InMemoryLedger::new();
        ledger.pay_fee(&key("k"), &alice(), 10).unwrap();
        let bytes = bincode::serialize(&ledger.snapshot()).unwrap();
        let restored = InMemoryLedger::restore(bincode::deserialize(&bytes).unwrap());
        restored.pay_fee(&key("k"), &alice(), 10).unwrap();
        assert_eq!(restored.balance(&alice()).available, 10);
    }
}
