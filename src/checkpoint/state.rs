use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CheckpointError;

/// Name of the per-model state file recording which snapshots exist.
pub const STATE_FILE: &str = "checkpoint.json";

/// Checkpoint index written next to the snapshot files after every save.
///
/// `restore` prefers this file; a directory scan is the fallback, so a
/// missing or stale index never loses checkpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointState {
    pub latest_step: usize,
    /// Steps currently on disk, ascending.
    pub retained_steps: Vec<usize>,
}

impl CheckpointState {
    /// Read the state file from `dir`. `Ok(None)` when the file is absent.
    pub fn read(dir: &Path) -> Result<Option<Self>, CheckpointError> {
        let path = dir.join(STATE_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path).map_err(|e| CheckpointError::StateRead {
            path: path.clone(),
            source: e,
        })?;
        let state = serde_json::from_str(&json)
            .map_err(|e| CheckpointError::StateParse { path, source: e })?;
        Ok(Some(state))
    }

    /// Write the state file into `dir`.
    pub fn write(&self, dir: &Path) -> Result<(), CheckpointError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(dir.join(STATE_FILE), json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let state = CheckpointState {
            latest_step: 3000,
            retained_steps: vec![1000, 2000, 3000],
        };
        state.write(dir.path()).unwrap();

        let read = CheckpointState::read(dir.path()).unwrap().unwrap();
        assert_eq!(read.latest_step, 3000);
        assert_eq!(read.retained_steps, vec![1000, 2000, 3000]);
    }

    #[test]
    fn test_read_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CheckpointState::read(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_read_malformed_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(STATE_FILE), "not json").unwrap();
        let err = CheckpointState::read(dir.path()).unwrap_err();
        assert!(matches!(err, CheckpointError::StateParse { .. }));
    }
}
