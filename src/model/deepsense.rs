use std::path::{Path, PathBuf};

use burn::module::AutodiffModule;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

use crate::checkpoint::{CheckpointManager, CheckpointManagerConfig};
use crate::error::ModelError;
use crate::model::network::{greedy_actions, DeepSenseNetwork};
use crate::model::param_store::ParamStore;
use crate::model::params::DeepSenseParams;

/// Model name used when none is given.
pub const DEFAULT_MODEL_NAME: &str = "deepsense";

/// DeepSense model wrapper: owns the network, its name-scoped checkpoint
/// directory, and the parameter-store cache.
///
/// Two instances with different names (e.g. an online and a target network)
/// are fully isolated: each owns its parameters and saves under its own
/// `<save_dir>/<name>/` directory.
pub struct DeepSense<B: AutodiffBackend> {
    params: DeepSenseParams,
    name: String,
    device: B::Device,
    checkpoints: CheckpointManager,
    network: Option<DeepSenseNetwork<B>>,
    weights: Option<ParamStore>,
    values: Option<Tensor<B::InnerBackend, 2>>,
    action: Option<Tensor<B::InnerBackend, 1, Int>>,
}

impl<B: AutodiffBackend> DeepSense<B> {
    /// Create a model. Validates the hyperparameters and creates
    /// `<save_dir>/<name>/` if absent.
    pub fn new(
        params: DeepSenseParams,
        checkpoint: CheckpointManagerConfig,
        name: Option<&str>,
        device: B::Device,
    ) -> Result<Self, ModelError> {
        params.validate()?;
        let name = name.unwrap_or(DEFAULT_MODEL_NAME).to_string();
        let checkpoints = CheckpointManager::new(checkpoint, &name);
        Ok(DeepSense {
            params,
            name,
            device,
            checkpoints,
            network: None,
            weights: None,
            values: None,
            action: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &DeepSenseParams {
        &self.params
    }

    pub fn model_dir(&self) -> &Path {
        self.checkpoints.model_dir()
    }

    /// The live network module, for external training loops. `None` before
    /// the first [`DeepSense::build_model`] call.
    pub fn network(&self) -> Option<&DeepSenseNetwork<B>> {
        self.network.as_ref()
    }

    /// Q-values `[batch, num_actions]` from the most recent
    /// [`DeepSense::build_model`] call.
    pub fn values(&self) -> Option<&Tensor<B::InnerBackend, 2>> {
        self.values.as_ref()
    }

    /// Greedy action indices `[batch]` from the most recent
    /// [`DeepSense::build_model`] call.
    pub fn action(&self) -> Option<&Tensor<B::InnerBackend, 1, Int>> {
        self.action.as_ref()
    }

    /// Run the forward pipeline and cache Q-values and greedy actions.
    ///
    /// `reuse = false` initializes fresh parameters (calling it again
    /// re-initializes them); `reuse = true` binds to the existing parameters
    /// and is an error if none exist yet. `train` selects the autodiff
    /// forward (dropout active, batch norm in training mode); otherwise the
    /// forward is deterministic inference.
    pub fn build_model(
        &mut self,
        inputs: Tensor<B::InnerBackend, 2>,
        train: bool,
        reuse: bool,
    ) -> Result<(), ModelError> {
        let [_, features] = inputs.dims();
        let expected = self.params.flat_input_len();
        if features != expected {
            return Err(ModelError::InputShape {
                expected,
                got: features,
            });
        }

        if !reuse {
            self.network = Some(self.params.init(&self.device));
            self.weights = None;
        }
        let Some(network) = self.network.as_ref() else {
            return Err(ModelError::ReuseBeforeBuild(self.name.clone()));
        };

        let values = if train {
            network.forward(Tensor::from_inner(inputs)).inner()
        } else {
            network.valid().forward(inputs)
        };
        self.action = Some(greedy_actions(values.clone()));
        self.values = Some(values);
        Ok(())
    }

    /// All trainable parameters keyed by layer path, collected once and
    /// cached. The cache is dropped on fresh initialization and on restore.
    pub fn weights(&mut self) -> Result<&ParamStore, ModelError> {
        if self.weights.is_none() {
            let Some(network) = self.network.as_ref() else {
                return Err(ModelError::NotBuilt(self.name.clone()));
            };
            self.weights = Some(ParamStore::collect(&network.clone().valid()));
        }
        Ok(self
            .weights
            .as_ref()
            .expect("weights cache populated above"))
    }

    /// Snapshot the current parameters to `<model_dir>/<name>-<step>.mpk`,
    /// pruning snapshots beyond the retention limit.
    pub fn save_model(&self, step: usize) -> Result<PathBuf, ModelError> {
        let Some(network) = self.network.as_ref() else {
            return Err(ModelError::NotBuilt(self.name.clone()));
        };
        let path = self.checkpoints.save(network.clone().valid(), step)?;
        Ok(path)
    }

    /// Restore the most recent snapshot in place.
    ///
    /// Returns `Ok(false)` (logged, non-exceptional) when no checkpoint
    /// exists; the parameters are left untouched in that case. Builds the
    /// network first if it has not been built yet.
    pub fn load_model(&mut self) -> Result<bool, ModelError> {
        let network = match self.network.take() {
            Some(network) => network,
            None => self.params.init(&self.device),
        };
        let (network, step) = self.checkpoints.restore(network, &self.device)?;
        self.network = Some(network);
        match step {
            Some(step) => {
                log::info!("model '{}' restored at step {}", self.name, step);
                self.weights = None;
                self.values = None;
                self.action = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
