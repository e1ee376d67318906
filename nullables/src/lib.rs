//! Nullable infrastructure for deterministic testing.
//!
//! Every external dependency of the oracle (time, the token ledger, the
//! pre-score model) sits behind a trait. This crate provides test-friendly
//! implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Can be told to fail, to exercise recovery paths
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod ledger;
pub mod prescore;

pub use clock::NullClock;
pub use ledger::{LedgerCall, NullLedger};
pub use prescore::FixedPreScore;
