//! Deterministic idempotency keys for ledger calls.

use oracle_types::{Address, ValidationId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one ledger operation so it is applied at most once.
///
/// Settlement keys have the shape `v{id}/{phase}/{op}/{address}`; recomputing
/// a settlement always yields the same keys.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Key for one step of a validation's settlement.
    pub fn settlement(validation: ValidationId, phase: &str, op: &str, account: &Address) -> Self {
        Self(format!("{validation}/{phase}/{op}/{account}"))
    }

    /// Key for escrowing a validator's registration stake.
    pub fn registration(account: &Address) -> Self {
        Self(format!("registration/escrow/{account}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settlement_key_layout() {
        let key = IdempotencyKey::settlement(
            ValidationId::new(7),
            "finalize",
            "fee",
            &Address::from("alice"),
        );
        assert_eq!(key.as_str(), "v7/finalize/fee/alice");
    }
}
