//! Fundamental types for the Quality Oracle.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! addresses, identifiers, entity categories, timestamps, basis-point math, the
//! tunable engine parameters, and the time and pre-score ports the engine is
//! driven through.

pub mod address;
pub mod bps;
pub mod ids;
pub mod params;
pub mod prescore;
pub mod time;

pub use address::Address;
pub use bps::{apply_bps, mul_div, BPS_DENOMINATOR};
pub use ids::{DisputeId, EntityId, EntityType, SectorId, ValidationId};
pub use params::OracleParams;
pub use prescore::{PreScoreProvider, MAX_PRE_SCORE};
pub use time::{Clock, SystemClock, Timestamp, SECS_PER_DAY};
