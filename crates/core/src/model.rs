use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Layers above this many parameters may be computationally intensive.
const INTENSIVE_PARAMETER_THRESHOLD: u64 = 1000;

/// Minimum division efficiency for a layer to be worth splitting.
const MIN_DIVISION_EFFICIENCY: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Conv2d,
    Linear,
    Other(String),
}

/// A single model layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub kind: LayerKind,
    pub parameters: u64,
    pub divisible: bool,
}

impl Layer {
    pub fn new(kind: LayerKind, parameters: u64, divisible: bool) -> Self {
        Self {
            kind,
            parameters,
            divisible,
        }
    }

    pub fn conv2d(parameters: u64) -> Self {
        Self::new(LayerKind::Conv2d, parameters, false)
    }

    pub fn linear(parameters: u64) -> Self {
        Self::new(LayerKind::Linear, parameters, true)
    }

    pub fn is_divisible(&self) -> bool {
        self.divisible
    }

    pub fn is_computationally_intensive(&self) -> bool {
        matches!(self.kind, LayerKind::Conv2d | LayerKind::Linear)
            && self.parameters > INTENSIVE_PARAMETER_THRESHOLD
    }

    /// How well the layer parallelizes when split across devices.
    /// Conv2d layers carry a high communication overhead when divided.
    pub fn division_efficiency(&self) -> f64 {
        match self.kind {
            LayerKind::Linear if self.divisible => 0.9,
            LayerKind::Conv2d => 0.1,
            _ => 0.0,
        }
    }
}

/// An ordered sequence of layers. Layer order is also the index space
/// used by whole-layer distribution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub name: String,
    layers: Vec<Layer>,
    total_parameters: u64,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layers: Vec::new(),
            total_parameters: 0,
        }
    }

    pub fn with_layers(name: impl Into<String>, layers: Vec<Layer>) -> Self {
        let mut model = Self::new(name);
        for layer in layers {
            model.add_layer(layer);
        }
        model
    }

    pub fn add_layer(&mut self, layer: Layer) {
        self.total_parameters += layer.parameters;
        self.layers.push(layer);
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn total_parameters(&self) -> u64 {
        self.total_parameters
    }

    /// Divisible layers that are efficient to split, with their indices.
    pub fn divisible_layers(&self) -> Vec<(usize, &Layer)> {
        self.layers
            .iter()
            .enumerate()
            .filter(|(_, l)| l.is_divisible() && l.division_efficiency() > MIN_DIVISION_EFFICIENCY)
            .collect()
    }

    /// Layers worth distributing horizontally: divisible and intensive.
    pub fn intensive_divisible_layers(&self) -> Vec<(usize, &Layer)> {
        self.layers
            .iter()
            .enumerate()
            .filter(|(_, l)| l.is_divisible() && l.is_computationally_intensive())
            .collect()
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} layers, {} params)",
            self.name,
            self.layers.len(),
            self.total_parameters
        )
    }
}

// --- Catalog ---

pub fn alexnet() -> Model {
    let mut layers: Vec<Layer> = [23_296, 307_456, 663_936, 885_120, 590_080]
        .into_iter()
        .map(Layer::conv2d)
        .collect();
    layers.extend([37_752_832, 16_781_312, 4_097_000].into_iter().map(Layer::linear));
    Model::with_layers("AlexNet", layers)
}

pub fn vgg11() -> Model {
    let mut layers: Vec<Layer> = [
        1_792, 36_928, 73_856, 147_584, 295_168, 590_080, 590_080, 590_080,
    ]
    .into_iter()
    .map(Layer::conv2d)
    .collect();
    layers.extend([102_764_544, 16_781_312, 4_097_000].into_iter().map(Layer::linear));
    Model::with_layers("VGG11", layers)
}

pub fn vgg19() -> Model {
    let mut layers: Vec<Layer> = [
        1_792, 36_928, 73_856, 147_584, 295_168, 590_080, 590_080, 590_080, 1_180_160,
        2_359_808, 2_359_808, 2_359_808, 2_359_808, 2_359_808, 2_359_808, 2_359_808,
    ]
    .into_iter()
    .map(Layer::conv2d)
    .collect();
    layers.extend([102_764_544, 16_781_312, 4_097_000].into_iter().map(Layer::linear));
    Model::with_layers("VGG19", layers)
}

/// Look up a catalog model by name (case-insensitive).
pub fn model_by_name(name: &str) -> Result<Model, CoreError> {
    match name.to_ascii_lowercase().as_str() {
        "alexnet" => Ok(alexnet()),
        "vgg11" => Ok(vgg11()),
        "vgg19" => Ok(vgg19()),
        _ => Err(CoreError::UnknownModel(name.to_string())),
    }
}
