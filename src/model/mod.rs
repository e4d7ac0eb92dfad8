mod deepsense;
mod network;
mod param_store;
mod params;

pub use deepsense::{DeepSense, DEFAULT_MODEL_NAME};
pub use network::{greedy_actions, ConvBlock, DeepSenseNetwork, DenseLayer, GruLayer};
pub use param_store::ParamStore;
pub use params::DeepSenseParams;
