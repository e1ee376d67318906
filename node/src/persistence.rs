//! On-disk engine snapshot.
//!
//! The whole engine state is one bincode blob. Writes go to a sibling temp
//! file that is renamed over the snapshot, so a crash mid-write leaves the
//! previous snapshot intact.

use oracle_ledger::LedgerSnapshot;
use oracle_validation::OracleSnapshot;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::NodeError;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    pub version: u32,
    pub oracle: OracleSnapshot,
    /// Present when the node runs its own in-memory ledger.
    pub ledger: Option<LedgerSnapshot>,
}

impl PersistedState {
    pub fn new(oracle: OracleSnapshot, ledger: Option<LedgerSnapshot>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            oracle,
            ledger,
        }
    }
}

pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot, or `None` if none has been written yet.
    pub fn load(&self) -> Result<Option<PersistedState>, NodeError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let state: PersistedState =
            bincode::deserialize(&bytes).map_err(|e| NodeError::Snapshot(e.to_string()))?;
        if state.version != SNAPSHOT_VERSION {
            return Err(NodeError::SnapshotVersion {
                found: state.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        tracing::info!(
            path = %self.path.display(),
            bytes = bytes.len(),
            validations = state.oracle.validations.len(),
            "snapshot loaded"
        );
        Ok(Some(state))
    }

    pub fn save(&self, state: &PersistedState) -> Result<(), NodeError> {
        let bytes = bincode::serialize(state).map_err(|e| NodeError::Snapshot(e.to_string()))?;
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "snapshot saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oracle_sectors::SectorStoreSnapshot;
    use oracle_validation::dispute::DisputeSnapshot;

    fn state(next_validation_id: u64) -> PersistedState {
        PersistedState::new(
            OracleSnapshot {
                sectors: SectorStoreSnapshot::default(),
                registry_journal: Vec::new(),
                validations: Vec::new(),
                next_validation_id,
                disputes: DisputeSnapshot::default(),
            },
            Some(LedgerSnapshot::default()),
        )
    }

    #[test]
    fn missing_snapshot_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("oracle.snapshot"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load_replaces_previous() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("nested").join("oracle.snapshot"));
        store.save(&state(3)).unwrap();
        store.save(&state(9)).unwrap();
        assert_eq!(store.load().unwrap(), Some(state(9)));
        assert!(!store.path().with_extension("tmp").exists());
    }

    #[test]
    fn corrupt_and_foreign_snapshots_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("oracle.snapshot"));

        fs::write(store.path(), b"not a snapshot").unwrap();
        assert!(matches!(store.load(), Err(NodeError::Snapshot(_))));

        let mut future = state(1);
        future.version = SNAPSHOT_VERSION + 1;
        store.save(&future).unwrap();
        assert!(matches!(
            store.load(),
            Err(NodeError::SnapshotVersion { found: 2, expected: 1 })
        ));
    }
}
