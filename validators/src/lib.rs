//! Validator registry for the Quality Oracle.
//!
//! Validators stake tokens, declare the sectors they serve and build an
//! accuracy record from how their votes compare to final outcomes. The
//! registry is the only place stake, status and accuracy change, and every
//! change is appended to a journal that can rebuild the registry from scratch.
//!
//! Cohort selection is seeded and reproducible: anyone holding the seed and
//! the registry can recompute which validators were assigned.

pub mod error;
pub mod journal;
pub mod registry;
pub mod selection;
pub mod validator;

pub use error::RegistryError;
pub use journal::{RegistryChange, RegistryEntry, StakeDelta, StakeReason};
pub use registry::ValidatorRegistry;
pub use selection::{derive_seed, weighted_sample};
pub use validator::{Validator, ValidatorStatus};
