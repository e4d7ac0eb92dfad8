use std::collections::BTreeMap;

use burn::prelude::*;
use burn::tensor::TensorData;

use crate::model::network::DeepSenseNetwork;

/// Explicit store of trainable parameters, keyed by layer path.
///
/// Paths follow the network topology (`conv_layers/conv_1/weight`,
/// `gru/cell_1/update_gate/input_weight`, `fully_connected/dense_1/weight`,
/// `q_values/weight`). There is no global registry: the store is collected
/// from the module tree a model instance owns, so paths carry no model-name
/// prefix.
#[derive(Debug, Default)]
pub struct ParamStore {
    entries: BTreeMap<String, TensorData>,
}

impl ParamStore {
    /// Snapshot every trainable parameter of the network.
    ///
    /// Batch-norm running statistics are not trainable and are not included;
    /// they travel with checkpoints, not with this store.
    pub fn collect<B: Backend>(network: &DeepSenseNetwork<B>) -> Self {
        let mut store = ParamStore::default();

        for (i, block) in network.conv_blocks.iter().enumerate() {
            let n = i + 1;
            store.insert(
                format!("conv_layers/conv_{n}/weight"),
                block.conv.weight.val().into_data(),
            );
            if let Some(bias) = &block.conv.bias {
                store.insert(format!("conv_layers/conv_{n}/bias"), bias.val().into_data());
            }
            store.insert(
                format!("conv_layers/batch_norm_{n}/gamma"),
                block.norm.gamma.val().into_data(),
            );
            store.insert(
                format!("conv_layers/batch_norm_{n}/beta"),
                block.norm.beta.val().into_data(),
            );
        }

        for (i, layer) in network.gru_layers.iter().enumerate() {
            let n = i + 1;
            let gates = [
                (&layer.cell.update_gate, "update_gate"),
                (&layer.cell.reset_gate, "reset_gate"),
                (&layer.cell.new_gate, "new_gate"),
            ];
            for (gate, gate_name) in gates {
                store.insert(
                    format!("gru/cell_{n}/{gate_name}/input_weight"),
                    gate.input_transform.weight.val().into_data(),
                );
                if let Some(bias) = &gate.input_transform.bias {
                    store.insert(
                        format!("gru/cell_{n}/{gate_name}/input_bias"),
                        bias.val().into_data(),
                    );
                }
                store.insert(
                    format!("gru/cell_{n}/{gate_name}/hidden_weight"),
                    gate.hidden_transform.weight.val().into_data(),
                );
                if let Some(bias) = &gate.hidden_transform.bias {
                    store.insert(
                        format!("gru/cell_{n}/{gate_name}/hidden_bias"),
                        bias.val().into_data(),
                    );
                }
            }
        }

        for (i, dense) in network.dense_layers.iter().enumerate() {
            let n = i + 1;
            store.insert(
                format!("fully_connected/dense_{n}/weight"),
                dense.linear.weight.val().into_data(),
            );
            if let Some(bias) = &dense.linear.bias {
                store.insert(
                    format!("fully_connected/dense_{n}/bias"),
                    bias.val().into_data(),
                );
            }
        }

        store.insert("q_values/weight".to_string(), network.q_head.weight.val().into_data());
        if let Some(bias) = &network.q_head.bias {
            store.insert("q_values/bias".to_string(), bias.val().into_data());
        }

        store
    }

    fn insert(&mut self, path: String, data: TensorData) {
        self.entries.insert(path, data);
    }

    pub fn get(&self, path: &str) -> Option<&TensorData> {
        self.entries.get(path)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TensorData)> {
        self.entries.iter().map(|(name, data)| (name.as_str(), data))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of scalar parameters across all entries.
    pub fn total_params(&self) -> usize {
        self.entries
            .values()
            .map(|data| data.shape.iter().product::<usize>())
            .sum()
    }
}
