use std::fs;
use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::prelude::*;
use burn::record::DefaultRecorder;

use crate::checkpoint::state::CheckpointState;
use crate::error::CheckpointError;
use crate::model::DeepSenseNetwork;

/// Snapshot file extension used by the recorder.
const SNAPSHOT_EXT: &str = "mpk";

/// Configuration for the checkpoint manager.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CheckpointManagerConfig {
    /// Root directory; each model saves under `<save_dir>/<model_name>/`.
    pub save_dir: PathBuf,
    /// Number of most-recent snapshots to retain.
    pub max_to_keep: usize,
}

impl Default for CheckpointManagerConfig {
    fn default() -> Self {
        CheckpointManagerConfig {
            save_dir: PathBuf::from("saved_models"),
            max_to_keep: 30,
        }
    }
}

/// Saves, restores, and prunes step-tagged parameter snapshots for one model.
///
/// Snapshots are Burn record files named `<model_name>-<step>.mpk`; a
/// `checkpoint.json` index beside them records the latest and retained steps.
pub struct CheckpointManager {
    model_name: String,
    model_dir: PathBuf,
    max_to_keep: usize,
}

impl CheckpointManager {
    /// Create a manager for `model_name`, creating its directory if absent.
    pub fn new(config: CheckpointManagerConfig, model_name: &str) -> Self {
        let model_dir = config.save_dir.join(model_name);
        fs::create_dir_all(&model_dir).ok();
        CheckpointManager {
            model_name: model_name.to_string(),
            model_dir,
            max_to_keep: config.max_to_keep.max(1),
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    fn snapshot_stem(&self, step: usize) -> PathBuf {
        self.model_dir.join(format!("{}-{}", self.model_name, step))
    }

    fn snapshot_path(&self, step: usize) -> PathBuf {
        self.snapshot_stem(step).with_extension(SNAPSHOT_EXT)
    }

    /// Record the network at `step`, prune beyond the retention limit, and
    /// rewrite the index. Returns the snapshot path.
    pub fn save<B: Backend>(
        &self,
        network: DeepSenseNetwork<B>,
        step: usize,
    ) -> Result<PathBuf, CheckpointError> {
        let stem = self.snapshot_stem(step);
        log::info!("saving model '{}' to {}", self.model_name, stem.display());

        let recorder = DefaultRecorder::default();
        network
            .save_file(stem, &recorder)
            .map_err(|e| CheckpointError::Record {
                path: self.snapshot_path(step),
                source: e,
            })?;

        let retained = self.prune()?;
        let latest = retained.last().copied().unwrap_or(step);
        CheckpointState {
            latest_step: latest,
            retained_steps: retained,
        }
        .write(&self.model_dir)?;

        let path = self.snapshot_path(step);
        log::info!("model '{}' saved to {}", self.model_name, path.display());
        Ok(path)
    }

    /// Load the most recent snapshot into `network`.
    ///
    /// Returns the (possibly restored) network together with the restored
    /// step, or `None` when no snapshot exists — the network is returned
    /// unchanged in that case. A missing directory is not an error.
    pub fn restore<B: Backend>(
        &self,
        network: DeepSenseNetwork<B>,
        device: &B::Device,
    ) -> Result<(DeepSenseNetwork<B>, Option<usize>), CheckpointError> {
        log::info!("loading checkpoints from {}", self.model_dir.display());

        let Some(step) = self.latest_step()? else {
            log::warn!("no checkpoint found in {}", self.model_dir.display());
            return Ok((network, None));
        };

        let stem = self.snapshot_stem(step);
        let recorder = DefaultRecorder::default();
        let network =
            network
                .load_file(stem, &recorder, device)
                .map_err(|e| CheckpointError::Record {
                    path: self.snapshot_path(step),
                    source: e,
                })?;

        log::info!(
            "model '{}' loaded from {}",
            self.model_name,
            self.snapshot_path(step).display()
        );
        Ok((network, Some(step)))
    }

    /// The step of the most recent snapshot, if any. Prefers the index
    /// file; falls back to scanning the directory.
    pub fn latest_step(&self) -> Result<Option<usize>, CheckpointError> {
        match CheckpointState::read(&self.model_dir) {
            Ok(Some(state)) if self.snapshot_path(state.latest_step).exists() => {
                return Ok(Some(state.latest_step));
            }
            Ok(_) => {}
            Err(CheckpointError::StateParse { path, source }) => {
                log::warn!(
                    "ignoring unreadable checkpoint index {} ({source})",
                    path.display()
                );
            }
            Err(e) => return Err(e),
        }
        Ok(self.scan_steps()?.last().copied())
    }

    /// Steps currently on disk, ascending.
    pub fn retained_steps(&self) -> Result<Vec<usize>, CheckpointError> {
        self.scan_steps()
    }

    /// Delete snapshots beyond the retention limit, oldest first. Returns
    /// the retained steps, ascending.
    fn prune(&self) -> Result<Vec<usize>, CheckpointError> {
        let mut steps = self.scan_steps()?;
        while steps.len() > self.max_to_keep {
            let oldest = steps.remove(0);
            fs::remove_file(self.snapshot_path(oldest))?;
        }
        Ok(steps)
    }

    fn scan_steps(&self) -> Result<Vec<usize>, CheckpointError> {
        if !self.model_dir.exists() {
            return Ok(Vec::new());
        }
        let prefix = format!("{}-", self.model_name);
        let mut steps = Vec::new();
        for entry in fs::read_dir(&self.model_dir)? {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            let Some(rest) = name.strip_prefix(prefix.as_str()) else {
                continue;
            };
            let Some(step) = rest.strip_suffix(".mpk") else {
                continue;
            };
            if let Ok(step) = step.parse::<usize>() {
                steps.push(step);
            }
        }
        steps.sort_unstable();
        steps.dedup();
        Ok(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::state::STATE_FILE;
    use crate::model::{DeepSenseParams, ParamStore};
    use crate::InferBackend;

    fn tiny_params() -> DeepSenseParams {
        DeepSenseParams {
            window_size: 3,
            split_size: 2,
            num_channels: 1,
            filter_sizes: vec![2],
            kernel_sizes: vec![2],
            conv_keep_prob: 1.0,
            gru_num_cells: 1,
            gru_cell_size: 4,
            gru_keep_prob: 1.0,
            dense_layer_sizes: vec![],
            dense_keep_prob: 1.0,
            num_actions: 2,
        }
    }

    fn tiny_network() -> DeepSenseNetwork<InferBackend> {
        tiny_params().init(&Default::default())
    }

    fn manager(dir: &Path, max_to_keep: usize) -> CheckpointManager {
        CheckpointManager::new(
            CheckpointManagerConfig {
                save_dir: dir.to_path_buf(),
                max_to_keep,
            },
            "deepsense",
        )
    }

    fn store_values(network: &DeepSenseNetwork<InferBackend>) -> Vec<Vec<f32>> {
        ParamStore::collect(network)
            .iter()
            .map(|(_, data)| data.to_vec::<f32>().unwrap())
            .collect()
    }

    #[test]
    fn test_save_writes_step_tagged_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 30);

        let path = manager.save(tiny_network(), 100).unwrap();
        assert_eq!(path, dir.path().join("deepsense").join("deepsense-100.mpk"));
        assert!(path.exists());
        assert!(dir.path().join("deepsense").join(STATE_FILE).exists());
    }

    #[test]
    fn test_retention_prunes_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 3);

        for step in [10, 20, 30, 40, 50] {
            manager.save(tiny_network(), step).unwrap();
        }

        assert_eq!(manager.retained_steps().unwrap(), vec![30, 40, 50]);
        assert!(!manager.snapshot_path(10).exists());
        assert!(!manager.snapshot_path(20).exists());
        assert!(manager.snapshot_path(50).exists());
    }

    #[test]
    fn test_default_retention_keeps_thirty() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), CheckpointManagerConfig::default().max_to_keep);

        for step in 0..=30 {
            manager.save(tiny_network(), step).unwrap();
        }

        let retained = manager.retained_steps().unwrap();
        assert_eq!(retained.len(), 30);
        assert_eq!(retained.first().copied(), Some(1), "step 0 must be pruned");
        assert_eq!(retained.last().copied(), Some(30));
    }

    #[test]
    fn test_restore_picks_latest_step() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 30);

        let older = tiny_network();
        let newer = tiny_network();
        manager.save(older, 1).unwrap();
        manager.save(newer.clone(), 2).unwrap();

        let (restored, step) = manager
            .restore(tiny_network(), &Default::default())
            .unwrap();
        assert_eq!(step, Some(2));
        assert_eq!(store_values(&restored), store_values(&newer));
    }

    #[test]
    fn test_restore_empty_dir_returns_unchanged_network() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 30);

        let network = tiny_network();
        let before = store_values(&network);
        let (network, step) = manager.restore(network, &Default::default()).unwrap();
        assert_eq!(step, None);
        assert_eq!(store_values(&network), before);
    }

    #[test]
    fn test_restore_missing_dir_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 30);
        fs::remove_dir_all(manager.model_dir()).unwrap();

        let (_, step) = manager
            .restore(tiny_network(), &Default::default())
            .unwrap();
        assert_eq!(step, None);
    }

    #[test]
    fn test_latest_step_scans_when_index_missing() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 30);

        manager.save(tiny_network(), 5).unwrap();
        manager.save(tiny_network(), 9).unwrap();
        fs::remove_file(manager.model_dir().join(STATE_FILE)).unwrap();

        assert_eq!(manager.latest_step().unwrap(), Some(9));
    }

    #[test]
    fn test_latest_step_survives_corrupt_index() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 30);

        manager.save(tiny_network(), 7).unwrap();
        fs::write(manager.model_dir().join(STATE_FILE), "not json").unwrap();

        assert_eq!(manager.latest_step().unwrap(), Some(7));
    }

    #[test]
    fn test_index_records_retained_steps() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 2);

        for step in [1, 2, 3] {
            manager.save(tiny_network(), step).unwrap();
        }

        let state = CheckpointState::read(manager.model_dir()).unwrap().unwrap();
        assert_eq!(state.latest_step, 3);
        assert_eq!(state.retained_steps, vec![2, 3]);
    }
}
