//! # DeepSense RL
//!
//! A DeepSense-style Q-network over windowed multi-channel timeseries for
//! reinforcement-learning action selection, built on the Burn ML framework.
//! The crate covers model construction, parameter introspection, and
//! checkpoint persistence with a retention policy; training loops, agents,
//! and replay buffers are external collaborators.
//!
//! ## Modules
//!
//! - [`model`] — hyperparameters, network topology, the [`model::DeepSense`] wrapper
//! - [`checkpoint`] — step-tagged parameter snapshots with retention
//! - [`config`] — TOML configuration loading and validation
//! - [`error`] — structured error types

#![recursion_limit = "256"]

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod model;

/// CPU inference backend, always available.
pub type InferBackend = burn::backend::NdArray<f32>;
/// Autodiff backend for training-mode forwards (dropout and batch norm
/// active). Inference goes through the `.valid()` module on [`InferBackend`].
pub type TrainBackend = burn::backend::Autodiff<InferBackend>;
