use crate::error::ConfigError;

/// DeepSense hyperparameters.
///
/// The raw input to the network is a windowed multi-channel timeseries,
/// flattened row-major to `[batch, split_size * window_size * num_channels]`.
/// Dropout probabilities are expressed as keep (survival) probabilities.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DeepSenseParams {
    /// Timesteps per split.
    pub window_size: usize,
    /// Number of splits the window sequence is divided into.
    pub split_size: usize,
    /// Input channels per timestep.
    pub num_channels: usize,
    /// Output filters per convolution stage.
    pub filter_sizes: Vec<usize>,
    /// Kernel width per convolution stage (over the time axis).
    pub kernel_sizes: Vec<usize>,
    pub conv_keep_prob: f64,
    /// Number of stacked GRU cells.
    pub gru_num_cells: usize,
    /// Hidden size of each GRU cell.
    pub gru_cell_size: usize,
    pub gru_keep_prob: f64,
    /// Fully-connected layer sizes between the recurrent stack and the Q head.
    pub dense_layer_sizes: Vec<usize>,
    pub dense_keep_prob: f64,
    /// Discrete actions, one Q-value each.
    pub num_actions: usize,
}

impl Default for DeepSenseParams {
    fn default() -> Self {
        DeepSenseParams {
            window_size: 12,
            split_size: 6,
            num_channels: 4,
            filter_sizes: vec![32, 32],
            kernel_sizes: vec![4, 4],
            conv_keep_prob: 0.8,
            gru_num_cells: 2,
            gru_cell_size: 64,
            gru_keep_prob: 0.5,
            dense_layer_sizes: vec![128, 64],
            dense_keep_prob: 0.5,
            num_actions: 3,
        }
    }
}

impl DeepSenseParams {
    /// Features per input row: `split_size * window_size * num_channels`.
    pub fn flat_input_len(&self) -> usize {
        self.split_size * self.window_size * self.num_channels
    }

    /// Width of the time axis after all valid-padding convolutions.
    pub fn conv_output_width(&self) -> usize {
        let shrink: usize = self.kernel_sizes.iter().map(|k| k.saturating_sub(1)).sum();
        self.window_size.saturating_sub(shrink)
    }

    /// Feature-vector length fed to the recurrent stack for each split.
    pub fn conv_feature_len(&self) -> usize {
        self.conv_output_width() * self.filter_sizes.last().copied().unwrap_or(0)
    }

    /// Validate the bundle. Messages are prefixed with `model.` so they read
    /// naturally when surfaced from config loading.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::Validation("model.window_size must be > 0".into()));
        }
        if self.split_size == 0 {
            return Err(ConfigError::Validation("model.split_size must be > 0".into()));
        }
        if self.num_channels == 0 {
            return Err(ConfigError::Validation("model.num_channels must be > 0".into()));
        }
        if self.num_actions == 0 {
            return Err(ConfigError::Validation("model.num_actions must be > 0".into()));
        }
        if self.filter_sizes.is_empty() {
            return Err(ConfigError::Validation(
                "model.filter_sizes must not be empty".into(),
            ));
        }
        if self.filter_sizes.len() != self.kernel_sizes.len() {
            return Err(ConfigError::Validation(format!(
                "model.filter_sizes ({}) and model.kernel_sizes ({}) must have the same length",
                self.filter_sizes.len(),
                self.kernel_sizes.len()
            )));
        }
        if self.filter_sizes.iter().any(|&f| f == 0) {
            return Err(ConfigError::Validation(
                "model.filter_sizes entries must be > 0".into(),
            ));
        }
        if self.kernel_sizes.iter().any(|&k| k == 0) {
            return Err(ConfigError::Validation(
                "model.kernel_sizes entries must be > 0".into(),
            ));
        }
        if self.conv_output_width() == 0 {
            return Err(ConfigError::Validation(format!(
                "model.kernel_sizes shrink the window to zero width (window_size {})",
                self.window_size
            )));
        }
        if self.gru_num_cells == 0 {
            return Err(ConfigError::Validation("model.gru_num_cells must be > 0".into()));
        }
        if self.gru_cell_size == 0 {
            return Err(ConfigError::Validation("model.gru_cell_size must be > 0".into()));
        }
        if self.dense_layer_sizes.iter().any(|&d| d == 0) {
            return Err(ConfigError::Validation(
                "model.dense_layer_sizes entries must be > 0".into(),
            ));
        }
        for (name, prob) in [
            ("model.conv_keep_prob", self.conv_keep_prob),
            ("model.gru_keep_prob", self.gru_keep_prob),
            ("model.dense_keep_prob", self.dense_keep_prob),
        ] {
            if !(prob > 0.0 && prob <= 1.0) {
                return Err(ConfigError::Validation(format!(
                    "{name} must be in (0, 1], got {prob}"
                )));
            }
        }
        Ok(())
    }
}
