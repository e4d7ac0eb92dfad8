use std::path::PathBuf;

/// Errors that can occur while building or querying the model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model '{0}' has not been built yet")]
    NotBuilt(String),

    #[error("reuse requested for model '{0}' but no parameters exist yet")]
    ReuseBeforeBuild(String),

    #[error("input has {got} features per row, expected {expected}")]
    InputShape { expected: usize, got: usize },

    #[error("invalid hyperparameters: {0}")]
    InvalidParams(#[from] ConfigError),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}

/// Errors that can occur during checkpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("failed to record checkpoint {path}: {source}")]
    Record {
        path: PathBuf,
        source: burn::record::RecorderError,
    },

    #[error("failed to read checkpoint state from {path}: {source}")]
    StateRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse checkpoint state from {path}: {source}")]
    StateParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}
