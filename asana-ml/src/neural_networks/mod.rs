//! Dense feedforward classifier used as the training backend.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{MLError, Result};

pub mod activations;
pub mod feedforward;
pub mod layers;
pub mod losses;
pub mod optimizers;

pub use activations::Activations;
pub use feedforward::FeedforwardNetwork;
pub use layers::DenseLayer;
pub use losses::LossFunction;
pub use optimizers::{AdamOptimizer, Optimizer, SGDOptimizer};

/// Activation function applied after a dense layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationType {
    /// Identity
    Linear,
    /// Rectified linear unit
    ReLU,
    /// Leaky ReLU with negative slope `alpha`
    LeakyReLU {
        /// Slope for negative inputs
        alpha: f64,
    },
    /// Logistic sigmoid
    Sigmoid,
    /// Hyperbolic tangent
    Tanh,
    /// Row-wise normalized probabilities
    Softmax,
}

/// One dense layer of the architecture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    /// Output width of the layer
    pub units: usize,

    /// Activation applied to the layer output
    pub activation: ActivationType,
}

impl LayerConfig {
    /// Create a dense layer configuration
    pub fn dense(units: usize, activation: ActivationType) -> Self {
        Self { units, activation }
    }
}

/// Shape and objective of a feedforward network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkArchitecture {
    /// Width of the input feature vector (D)
    pub input_dim: usize,

    /// Dense layers from input to output
    pub layers: Vec<LayerConfig>,

    /// Objective minimized during training
    pub loss_function: LossFunction,
}

impl NetworkArchitecture {
    /// Two dense layers: a hidden layer and a softmax output over `num_classes`,
    /// trained with categorical cross-entropy.
    pub fn classifier(
        input_dim: usize,
        hidden_units: usize,
        hidden_activation: ActivationType,
        num_classes: usize,
    ) -> Self {
        Self {
            input_dim,
            layers: vec![
                LayerConfig::dense(hidden_units, hidden_activation),
                LayerConfig::dense(num_classes, ActivationType::Softmax),
            ],
            loss_function: LossFunction::CategoricalCrossEntropy,
        }
    }

    /// Width of the network output
    pub fn output_dim(&self) -> usize {
        self.layers.last().map_or(self.input_dim, |layer| layer.units)
    }

    /// Reject empty or zero-width architectures
    pub fn validate(&self) -> Result<()> {
        if self.input_dim == 0 {
            return Err(MLError::model("input dimension cannot be zero"));
        }
        if self.layers.is_empty() {
            return Err(MLError::model("network needs at least one layer"));
        }
        if let Some(index) = self.layers.iter().position(|layer| layer.units == 0) {
            return Err(MLError::model(format!("layer {} has zero units", index)));
        }
        let hidden = &self.layers[..self.layers.len() - 1];
        if hidden
            .iter()
            .any(|layer| layer.activation == ActivationType::Softmax)
        {
            return Err(MLError::model("softmax is only supported on the output layer"));
        }
        Ok(())
    }
}

/// Builder for feedforward networks
#[derive(Debug, Clone)]
pub struct NeuralNetworkBuilder {
    input_dim: usize,
    layers: Vec<LayerConfig>,
    loss_function: LossFunction,
}

impl NeuralNetworkBuilder {
    /// Start a network that takes `input_dim` features
    pub fn new(input_dim: usize) -> Self {
        Self {
            input_dim,
            layers: Vec::new(),
            loss_function: LossFunction::CategoricalCrossEntropy,
        }
    }

    /// Append a dense layer
    pub fn dense(mut self, units: usize, activation: ActivationType) -> Self {
        self.layers.push(LayerConfig::dense(units, activation));
        self
    }

    /// Set the training objective
    pub fn loss(mut self, loss_function: LossFunction) -> Self {
        self.loss_function = loss_function;
        self
    }

    /// Build the architecture without initializing weights
    pub fn architecture(self) -> NetworkArchitecture {
        NetworkArchitecture {
            input_dim: self.input_dim,
            layers: self.layers,
            loss_function: self.loss_function,
        }
    }

    /// Build and initialize the network
    pub fn build<R: Rng + ?Sized>(self, rng: &mut R) -> Result<FeedforwardNetwork> {
        FeedforwardNetwork::new(self.architecture(), rng)
    }
}
