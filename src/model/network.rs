use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::gru::{Gru, GruConfig};
use burn::nn::{
    BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Linear, LinearConfig, Relu,
};
use burn::prelude::*;

use crate::model::params::DeepSenseParams;

/// One convolution stage: 1-D convolution over the time axis (expressed as
/// 2-D with unit height), batch norm, ReLU, and dropout on every stage
/// except the last.
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv: Conv2d<B>,
    pub norm: BatchNorm<B, 2>,
    activation: Relu,
    dropout: Option<Dropout>,
}

impl<B: Backend> ConvBlock<B> {
    /// Forward pass: `[batch, in_ch, split, w]` -> `[batch, out_ch, split, w - k + 1]`.
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(input);
        let x = self.norm.forward(x);
        let x = self.activation.forward(x);
        match &self.dropout {
            Some(dropout) => dropout.forward(x),
            None => x,
        }
    }
}

/// One recurrent layer: a GRU cell with output dropout.
#[derive(Module, Debug)]
pub struct GruLayer<B: Backend> {
    pub cell: Gru<B>,
    dropout: Dropout,
}

impl<B: Backend> GruLayer<B> {
    /// Forward pass over a split sequence: `[batch, seq, in]` -> `[batch, seq, hidden]`.
    pub fn forward(&self, input: Tensor<B, 3>) -> Tensor<B, 3> {
        self.dropout.forward(self.cell.forward(input, None))
    }
}

/// One fully-connected layer: linear, ReLU, and dropout between layers
/// (none after the last).
#[derive(Module, Debug)]
pub struct DenseLayer<B: Backend> {
    pub linear: Linear<B>,
    activation: Relu,
    dropout: Option<Dropout>,
}

impl<B: Backend> DenseLayer<B> {
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.activation.forward(self.linear.forward(input));
        match &self.dropout {
            Some(dropout) => dropout.forward(x),
            None => x,
        }
    }
}

/// DeepSense Q-network over a windowed multi-channel timeseries.
///
/// ```text
/// Input:   [batch, split * window * channels]
/// Reshape: [batch, channels, split, window]
/// Convs:   per stage conv([1, k]) -> batch norm -> ReLU -> dropout
/// Flatten: [batch, split, conv_out_width * last_filters]
/// GRUs:    stacked cells with output dropout; final timestep kept
/// Dense:   linear -> ReLU -> dropout between layers
/// Q head:  [batch, num_actions]
/// ```
///
/// Dropout and batch-norm training behavior follow the backend: forwards on
/// an autodiff backend train, forwards on the `.valid()` module are
/// deterministic inference.
#[derive(Module, Debug)]
pub struct DeepSenseNetwork<B: Backend> {
    pub conv_blocks: Vec<ConvBlock<B>>,
    pub gru_layers: Vec<GruLayer<B>>,
    pub dense_layers: Vec<DenseLayer<B>>,
    pub q_head: Linear<B>,
    split_size: usize,
    window_size: usize,
    num_channels: usize,
    num_actions: usize,
}

impl DeepSenseParams {
    /// Initialize a [`DeepSenseNetwork`] with fresh parameters.
    ///
    /// The params must be valid (see [`DeepSenseParams::validate`]); sizes
    /// are taken at face value here.
    pub fn init<B: Backend>(&self, device: &B::Device) -> DeepSenseNetwork<B> {
        let last_conv = self.filter_sizes.len() - 1;
        let mut conv_blocks = Vec::with_capacity(self.filter_sizes.len());
        let mut in_channels = self.num_channels;
        for (i, (&filters, &kernel)) in
            self.filter_sizes.iter().zip(&self.kernel_sizes).enumerate()
        {
            let dropout =
                (i < last_conv).then(|| DropoutConfig::new(1.0 - self.conv_keep_prob).init());
            conv_blocks.push(ConvBlock {
                conv: Conv2dConfig::new([in_channels, filters], [1, kernel]).init(device),
                norm: BatchNormConfig::new(filters).init(device),
                activation: Relu::new(),
                dropout,
            });
            in_channels = filters;
        }

        let mut gru_layers = Vec::with_capacity(self.gru_num_cells);
        let mut gru_input = self.conv_feature_len();
        for _ in 0..self.gru_num_cells {
            gru_layers.push(GruLayer {
                cell: GruConfig::new(gru_input, self.gru_cell_size, true).init(device),
                dropout: DropoutConfig::new(1.0 - self.gru_keep_prob).init(),
            });
            gru_input = self.gru_cell_size;
        }

        let last_dense = self.dense_layer_sizes.len().saturating_sub(1);
        let mut dense_layers = Vec::with_capacity(self.dense_layer_sizes.len());
        let mut width = self.gru_cell_size;
        for (i, &units) in self.dense_layer_sizes.iter().enumerate() {
            let dropout =
                (i < last_dense).then(|| DropoutConfig::new(1.0 - self.dense_keep_prob).init());
            dense_layers.push(DenseLayer {
                linear: LinearConfig::new(width, units).init(device),
                activation: Relu::new(),
                dropout,
            });
            width = units;
        }

        DeepSenseNetwork {
            conv_blocks,
            gru_layers,
            dense_layers,
            q_head: LinearConfig::new(width, self.num_actions).init(device),
            split_size: self.split_size,
            window_size: self.window_size,
            num_channels: self.num_channels,
            num_actions: self.num_actions,
        }
    }
}

impl<B: Backend> DeepSenseNetwork<B> {
    /// Forward pass: `[batch, split * window * channels]` -> Q-values
    /// `[batch, num_actions]`.
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch, _features] = input.dims();

        // Row layout is (split, window, channel); convolutions want NCHW.
        let mut x = input
            .reshape([
                batch,
                self.split_size,
                self.window_size,
                self.num_channels,
            ])
            .permute([0, 3, 1, 2]);
        for block in &self.conv_blocks {
            x = block.forward(x);
        }

        // [batch, filters, split, w'] -> per-split feature vectors.
        let mut seq = x
            .permute([0, 2, 3, 1])
            .reshape([batch as i32, self.split_size as i32, -1]);
        for layer in &self.gru_layers {
            seq = layer.forward(seq);
        }
        let [b, s, h] = seq.dims();
        let mut out = seq
            .slice([0..b, s - 1..s, 0..h])
            .reshape([b as i32, h as i32]);

        for dense in &self.dense_layers {
            out = dense.forward(out);
        }
        self.q_head.forward(out)
    }

    pub fn num_actions(&self) -> usize {
        self.num_actions
    }
}

/// Greedy action per batch row: index of the maximum Q-value.
pub fn greedy_actions<B: Backend>(q_values: Tensor<B, 2>) -> Tensor<B, 1, Int> {
    let [batch, _] = q_values.dims();
    q_values.argmax(1).reshape([batch as i32])
}
