// src/models/dense.rs
//! Feed-forward networks exported from the training job.
//!
//! A model artifact is a JSON descriptor plus a safetensors file. The
//! descriptor lists a shared trunk and one or more output heads; every layer
//! names a tensor prefix with `<prefix>.weight` shaped `(out, in)` and an
//! optional `<prefix>.bias` shaped `(out,)`. Each head must end in a single
//! unit, so a model with `n` heads produces `n` scalar outputs.

use anyhow::{anyhow, Context, Result};
use candle_core::{Device, Tensor};
use candle_nn::{Linear, Module};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::features::FeatureVector;
use crate::models::Predictor;
use crate::utils::candle::inference_device;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Sigmoid,
    Tanh,
}

impl Activation {
    fn apply(&self, xs: Tensor) -> candle_core::Result<Tensor> {
        match self {
            Activation::Linear => Ok(xs),
            Activation::Relu => xs.relu(),
            Activation::Sigmoid => candle_nn::ops::sigmoid(&xs),
            Activation::Tanh => xs.tanh(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerSpec {
    pub prefix: String,
    #[serde(default)]
    pub activation: Activation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadSpec {
    pub name: String,
    pub layers: Vec<LayerSpec>,
}

/// The JSON descriptor written next to the weights file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
    /// Safetensors file, relative to the descriptor's directory.
    pub weights: PathBuf,
    pub input_dim: usize,
    #[serde(default)]
    pub trunk: Vec<LayerSpec>,
    pub heads: Vec<HeadSpec>,
}

struct DenseLayer {
    linear: Linear,
    activation: Activation,
    out_dim: usize,
}

impl DenseLayer {
    fn build(spec: &LayerSpec, in_dim: usize, tensors: &HashMap<String, Tensor>) -> Result<Self> {
        let weight_key = format!("{}.weight", spec.prefix);
        let weight = tensors
            .get(&weight_key)
            .ok_or_else(|| anyhow!("Weights file has no tensor '{}'", weight_key))?
            .clone();
        let (out_dim, weight_in) = weight
            .dims2()
            .with_context(|| format!("Tensor '{}' must be 2-dimensional", weight_key))?;
        if weight_in != in_dim {
            return Err(anyhow!(
                "Layer '{}' expects {} inputs but receives {}",
                spec.prefix,
                weight_in,
                in_dim
            ));
        }

        let bias = match tensors.get(&format!("{}.bias", spec.prefix)) {
            Some(bias) => {
                let bias_dim = bias
                    .dims1()
                    .with_context(|| format!("Bias of layer '{}' must be 1-dimensional", spec.prefix))?;
                if bias_dim != out_dim {
                    return Err(anyhow!(
                        "Bias of layer '{}' has {} values for {} units",
                        spec.prefix,
                        bias_dim,
                        out_dim
                    ));
                }
                Some(bias.clone())
            }
            None => None,
        };

        Ok(Self {
            linear: Linear::new(weight, bias),
            activation: spec.activation,
            out_dim,
        })
    }

    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        self.activation.apply(self.linear.forward(xs)?)
    }
}

struct DenseHead {
    name: String,
    layers: Vec<DenseLayer>,
}

pub struct DenseNetwork {
    name: String,
    input_dim: usize,
    trunk: Vec<DenseLayer>,
    heads: Vec<DenseHead>,
    device: Device,
}

impl DenseNetwork {
    /// Reads a descriptor and the weights file it points at.
    pub fn load(descriptor_path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(descriptor_path).with_context(|| {
            format!("Missing required model file: {}", descriptor_path.display())
        })?;
        let descriptor: ModelDescriptor = serde_json::from_str(&raw).with_context(|| {
            format!("Failed to parse model descriptor {}", descriptor_path.display())
        })?;

        let weights_path = descriptor_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(&descriptor.weights);
        let device = inference_device().clone();
        let tensors = candle_core::safetensors::load(&weights_path, &device)
            .with_context(|| format!("Failed to load model weights {}", weights_path.display()))?;

        let network = Self::from_tensors(&descriptor, &tensors, device)
            .with_context(|| format!("Invalid model '{}'", descriptor.name))?;
        info!(
            "Loaded model '{}' from {} ({} trunk layers, {} heads, {} inputs)",
            network.name,
            descriptor_path.display(),
            network.trunk.len(),
            network.heads.len(),
            network.input_dim
        );
        Ok(network)
    }

    pub fn from_tensors(
        descriptor: &ModelDescriptor,
        tensors: &HashMap<String, Tensor>,
        device: Device,
    ) -> Result<Self> {
        if descriptor.heads.is_empty() {
            return Err(anyhow!("Model '{}' declares no output heads", descriptor.name));
        }

        let mut width = descriptor.input_dim;
        let mut trunk = Vec::with_capacity(descriptor.trunk.len());
        for spec in &descriptor.trunk {
            let layer = DenseLayer::build(spec, width, tensors)?;
            width = layer.out_dim;
            trunk.push(layer);
        }

        let mut heads = Vec::with_capacity(descriptor.heads.len());
        for head_spec in &descriptor.heads {
            if head_spec.layers.is_empty() {
                return Err(anyhow!("Head '{}' has no layers", head_spec.name));
            }
            let mut head_width = width;
            let mut layers = Vec::with_capacity(head_spec.layers.len());
            for spec in &head_spec.layers {
                let layer = DenseLayer::build(spec, head_width, tensors)?;
                head_width = layer.out_dim;
                layers.push(layer);
            }
            if head_width != 1 {
                return Err(anyhow!(
                    "Head '{}' must end in a single unit, found {}",
                    head_spec.name,
                    head_width
                ));
            }
            heads.push(DenseHead {
                name: head_spec.name.clone(),
                layers,
            });
        }

        Ok(Self {
            name: descriptor.name.clone(),
            input_dim: descriptor.input_dim,
            trunk,
            heads,
            device,
        })
    }

    pub fn head_names(&self) -> Vec<&str> {
        self.heads.iter().map(|head| head.name.as_str()).collect()
    }
}

impl Predictor for DenseNetwork {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn predict(&self, features: &FeatureVector) -> Result<Vec<f32>> {
        if features.len() != self.input_dim {
            return Err(anyhow!(
                "Model '{}' expects {} features, got {}",
                self.name,
                self.input_dim,
                features.len()
            ));
        }

        let xs = Tensor::from_slice(features.as_slice(), (1, features.len()), &self.device)
            .context("Failed to create input tensor")?;
        let mut hidden = xs;
        for layer in &self.trunk {
            hidden = layer.forward(&hidden)?;
        }

        let mut outputs = Vec::with_capacity(self.heads.len());
        for head in &self.heads {
            let mut out = hidden.clone();
            for layer in &head.layers {
                out = layer.forward(&out)?;
            }
            let value = out
                .flatten_all()?
                .to_vec1::<f32>()
                .with_context(|| format!("Failed to read output of head '{}'", head.name))?
                .first()
                .copied()
                .ok_or_else(|| anyhow!("Head '{}' produced no output", head.name))?;
            outputs.push(value);
        }
        debug!("Model '{}' outputs: {:?}", self.name, outputs);
        Ok(outputs)
    }
}
