//! Sector configuration for the Quality Oracle.
//!
//! Each sector is an independent domain with its own validator pool and
//! policy. Policy is stored per `(sector, entity type)` as immutable,
//! versioned [`EntityTypeConfig`] snapshots: an update publishes a new
//! version and never touches the snapshot an in-flight validation holds.
//!
//! The store is injected into every component that needs policy; there is no
//! process-wide configuration singleton.

pub mod config;
pub mod error;
pub mod policy;
pub mod store;

pub use config::EntityTypeConfig;
pub use error::SectorError;
pub use policy::SectorPolicy;
pub use store::{SectorConfigStore, SectorStoreSnapshot};
