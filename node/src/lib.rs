//! Quality Oracle node.
//!
//! Wraps the validation engine in everything a long-running process needs:
//! - TOML configuration with seed sectors and accounts
//! - Structured logging
//! - Snapshot persistence across restarts
//! - Timeout and snapshot background loops
//! - Prometheus metrics fed from engine events
//! - Graceful shutdown on SIGINT/SIGTERM

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod persistence;
pub mod scheduler;
pub mod service;
pub mod shutdown;

pub use config::{AccountSeed, EntityTypeSeed, OracleNodeConfig, SectorSeed, SNAPSHOT_FILE};
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::OracleMetrics;
pub use node::OracleNode;
pub use persistence::{PersistedState, SnapshotStore, SNAPSHOT_VERSION};
pub use service::OracleService;
pub use shutdown::ShutdownController;
