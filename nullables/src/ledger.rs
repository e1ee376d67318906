//! Nullable ledger: an in-memory ledger that records calls and fails on demand.

use oracle_ledger::{IdempotencyKey, InMemoryLedger, LedgerError, LedgerOp, TokenLedger};
use oracle_types::Address;
use parking_lot::Mutex;

/// A ledger call as seen by the nullable, whether or not it succeeded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerCall {
    pub op: LedgerOp,
    pub key: IdempotencyKey,
    pub account: Address,
    pub amount: u128,
    pub failed: bool,
}

#[derive(Default)]
struct Failures {
    next: u32,
    always: bool,
    ops: Vec<LedgerOp>,
}

/// Wraps an [`InMemoryLedger`] with call recording and failure injection.
///
/// An injected failure returns `LedgerError::Unavailable` before the inner
/// ledger is touched, so no funds move and no receipt is written.
#[derive(Default)]
pub struct NullLedger {
    inner: InMemoryLedger,
    failures: Mutex<Failures>,
    calls: Mutex<Vec<LedgerCall>>,
}

impl NullLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// The wrapped ledger, for funding accounts and asserting on balances.
    pub fn inner(&self) -> &InMemoryLedger {
        &self.inner
    }

    pub fn fund(&self, account: &Address, amount: u128) {
        self.inner.fund(account, amount);
    }

    /// Fail the next `count` calls of any kind.
    pub fn fail_next(&self, count: u32) {
        self.failures.lock().next = count;
    }

    /// Fail every call until [`heal`](Self::heal).
    pub fn fail_always(&self) {
        self.failures.lock().always = true;
    }

    /// Fail every call of one kind until [`heal`](Self::heal).
    pub fn fail_on(&self, op: LedgerOp) {
        self.failures.lock().ops.push(op);
    }

    /// Clear all injected failures.
    pub fn heal(&self) {
        *self.failures.lock() = Failures::default();
    }

    /// Every call received, in order.
    pub fn calls(&self) -> Vec<LedgerCall> {
        self.calls.lock().clone()
    }

    fn call<T>(
        &self,
        op: LedgerOp,
        key: &IdempotencyKey,
        account: &Address,
        amount: u128,
        apply: impl FnOnce(&InMemoryLedger) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let fail = {
            let mut failures = self.failures.lock();
            if failures.next > 0 {
                failures.next -= 1;
                true
            } else {
                failures.always || failures.ops.contains(&op)
            }
        };
        self.calls.lock().push(LedgerCall {
            op,
            key: key.clone(),
            account: account.clone(),
            amount,
            failed: fail,
        });
        if fail {
            return Err(LedgerError::Unavailable(format!("injected failure on {key}")));
        }
        apply(&self.inner)
    }
}

impl TokenLedger for NullLedger {
    fn escrow_stake(&self, key: &IdempotencyKey, account: &Address, amount: u128) -> Result<(), LedgerError> {
        self.call(LedgerOp::Escrow, key, account, amount, |l| l.escrow_stake(key, account, amount))
    }

    fn release_stake(&self, key: &IdempotencyKey, account: &Address, amount: u128) -> Result<(), LedgerError> {
        self.call(LedgerOp::Release, key, account, amount, |l| l.release_stake(key, account, amount))
    }

    fn slash(&self, key: &IdempotencyKey, account: &Address, amount: u128) -> Result<u128, LedgerError> {
        self.call(LedgerOp::Slash, key, account, amount, |l| l.slash(key, account, amount))
    }

    fn pay_fee(&self, key: &IdempotencyKey, account: &Address, amount: u128) -> Result<(), LedgerError> {
        self.call(LedgerOp::PayFee, key, account, amount, |l| l.pay_fee(key, account, amount))
    }
}
