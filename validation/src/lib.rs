//! Quality validation and dispute resolution.
//!
//! A submitted entity becomes a [`Validation`]: a cohort of staked validators
//! is drawn for it, their reputation-weighted votes are tallied, and the
//! validation is decided early once one side clears a strict majority of the
//! assigned weight, at full participation, or by timeout (conservative
//! Reject). Settlement then pays fees, moves accuracy and, after an
//! overturned dispute, slashes the validators who backed the wrong outcome.
//!
//! [`QualityOracle`] composes the pieces behind a thread-safe facade.
//! Everything below it is either pure (`voting`, `resolver`, `settlement`,
//! `stats`) or owns one kind of record (`queue`, `dispute`).

pub mod dispute;
pub mod error;
pub mod oracle;
pub mod prescore;
pub mod queue;
pub mod resolver;
pub mod settlement;
pub mod state;
pub mod stats;
pub mod voting;

pub use dispute::{Dispute, DisputeManager, DisputeResolution, DisputeStatus};
pub use error::{ErrorKind, ValidationError};
pub use oracle::{OracleEvent, OracleSettings, OracleSnapshot, QualityOracle, VoteReceipt};
pub use queue::{SubmitRequest, ValidationQueue};
pub use resolver::QuorumResolver;
pub use settlement::{SettlementPlan, SettlementSummary};
pub use state::{Assignment, Outcome, Validation, ValidationStatus, Vote, VoteChoice};
pub use stats::SectorStats;
pub use voting::{Tally, VoteDecision, WeightedVotingEngine};
