//! Dense (fully connected) layer.

use ndarray::Array2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{MLError, Result};
use crate::neural_networks::{Activations, ActivationType};

/// Dense (fully connected) layer
///
/// `weights` is `[output, input]` and `biases` is `[1, output]`, so the
/// forward pass is `activation(input · Wᵀ + b)` for a `[batch, input]` input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDenseLayer")]
pub struct DenseLayer {
    weights: Array2<f64>,
    biases: Array2<f64>,
    activation: ActivationType,
}

/// Unchecked serialized form; goes through [`DenseLayer::from_parts`]
#[derive(Deserialize)]
struct RawDenseLayer {
    weights: Array2<f64>,
    biases: Array2<f64>,
    activation: ActivationType,
}

impl TryFrom<RawDenseLayer> for DenseLayer {
    type Error = MLError;

    fn try_from(raw: RawDenseLayer) -> Result<Self> {
        Self::from_parts(raw.weights, raw.biases, raw.activation)
    }
}

/// Intermediate values of one forward pass, kept for backpropagation
#[derive(Debug, Clone)]
pub struct DenseForward {
    /// Pre-activation `input · Wᵀ + b`
    pub pre_activation: Array2<f64>,
    /// Activated output
    pub output: Array2<f64>,
}

impl DenseLayer {
    /// Glorot-uniform weights in `±sqrt(6 / (fan_in + fan_out))`, zero biases
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        output_size: usize,
        activation: ActivationType,
        rng: &mut R,
    ) -> Self {
        let limit = (6.0 / (input_size + output_size) as f64).sqrt();
        let weights =
            Array2::from_shape_fn((output_size, input_size), |_| rng.gen_range(-limit..limit));

        Self {
            weights,
            biases: Array2::zeros((1, output_size)),
            activation,
        }
    }

    /// Rebuild a layer from stored parameters
    pub fn from_parts(
        weights: Array2<f64>,
        biases: Array2<f64>,
        activation: ActivationType,
    ) -> Result<Self> {
        if biases.nrows() != 1 || biases.ncols() != weights.nrows() {
            return Err(MLError::shape_mismatch(format!(
                "bias shape {:?} does not fit weight shape {:?}",
                biases.shape(),
                weights.shape()
            )));
        }
        Ok(Self {
            weights,
            biases,
            activation,
        })
    }

    /// Input width
    pub fn input_size(&self) -> usize {
        self.weights.ncols()
    }

    /// Output width
    pub fn output_size(&self) -> usize {
        self.weights.nrows()
    }

    /// Activation applied after the affine map
    pub fn activation(&self) -> ActivationType {
        self.activation
    }

    /// `[output, input]` weight matrix
    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    /// `[1, output]` bias row
    pub fn biases(&self) -> &Array2<f64> {
        &self.biases
    }

    /// Trainable parameters in optimizer order: weights, then biases
    pub fn parameters_mut(&mut self) -> [&mut Array2<f64>; 2] {
        [&mut self.weights, &mut self.biases]
    }

    /// Number of trainable scalars
    pub fn parameter_count(&self) -> usize {
        self.weights.len() + self.biases.len()
    }

    /// Forward pass keeping the pre-activation
    pub fn forward_with_cache(&self, input: &Array2<f64>) -> Result<DenseForward> {
        if input.ncols() != self.input_size() {
            return Err(MLError::shape_mismatch(format!(
                "layer expects {} inputs, got {}",
                self.input_size(),
                input.ncols()
            )));
        }
        let pre_activation = input.dot(&self.weights.t()) + &self.biases;
        let output = Activations::apply(&pre_activation, &self.activation);
        Ok(DenseForward {
            pre_activation,
            output,
        })
    }

    /// Forward pass
    pub fn forward(&self, input: &Array2<f64>) -> Result<Array2<f64>> {
        Ok(self.forward_with_cache(input)?.output)
    }

    /// Backward pass.
    ///
    /// Returns `(input_gradient, weight_gradient, bias_gradient)` for the
    /// `input` and cached `forward` of the same pass.
    pub fn backward(
        &self,
        input: &Array2<f64>,
        forward: &DenseForward,
        output_gradient: &Array2<f64>,
    ) -> (Array2<f64>, Array2<f64>, Array2<f64>) {
        let delta = Activations::backward(
            &forward.pre_activation,
            &forward.output,
            output_gradient,
            &self.activation,
        );
        let weight_gradient = delta.t().dot(input);
        let bias_gradient = delta.sum_axis(ndarray::Axis(0)).insert_axis(ndarray::Axis(0));
        let input_gradient = delta.dot(&self.weights);
        (input_gradient, weight_gradient, bias_gradient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_dense_layer_forward() {
        let mut rng = StdRng::seed_from_u64(0);
        let layer = DenseLayer::new(10, 5, ActivationType::ReLU, &mut rng);
        let input = Array2::ones((2, 10));

        let output = layer.forward(&input).unwrap();
        assert_eq!(output.shape(), &[2, 5]);
        assert!(output.iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn test_glorot_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        let layer = DenseLayer::new(34, 10, ActivationType::ReLU, &mut rng);
        let limit = (6.0f64 / 44.0).sqrt();
        assert!(layer.weights().iter().all(|w| w.abs() <= limit));
        assert!(layer.biases().iter().all(|b| *b == 0.0));
    }

    #[test]
    fn test_rejects_wrong_input_width() {
        let mut rng = StdRng::seed_from_u64(0);
        let layer = DenseLayer::new(3, 2, ActivationType::Linear, &mut rng);
        let result = layer.forward(&Array2::ones((1, 4)));
        assert!(matches!(result, Err(MLError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_linear_forward_and_backward() {
        let layer = DenseLayer::from_parts(
            array![[1.0, 2.0], [0.0, -1.0]],
            array![[0.5, 0.0]],
            ActivationType::Linear,
        )
        .unwrap();
        let input = array![[1.0, 1.0]];
        let forward = layer.forward_with_cache(&input).unwrap();
        assert_eq!(forward.output, array![[3.5, -1.0]]);

        let (dx, dw, db) = layer.backward(&input, &forward, &array![[1.0, 1.0]]);
        assert_eq!(dw, array![[1.0, 1.0], [1.0, 1.0]]);
        assert_eq!(db, array![[1.0, 1.0]]);
        assert_eq!(dx, array![[1.0, 1.0]]);
    }

    #[test]
    fn test_from_parts_checks_bias_shape() {
        let result = DenseLayer::from_parts(
            Array2::zeros((3, 2)),
            Array2::zeros((1, 2)),
            ActivationType::Linear,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_checks_bias_shape() {
        let mut rng = StdRng::seed_from_u64(2);
        let layer = DenseLayer::new(3, 5, ActivationType::ReLU, &mut rng);
        let mut value = serde_json::to_value(&layer).unwrap();

        let back: DenseLayer = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(back.input_size(), 3);
        assert_eq!(back.biases().shape(), &[1, 5]);

        value["biases"] = serde_json::to_value(Array2::<f64>::zeros((1, 3))).unwrap();
        assert!(serde_json::from_value::<DenseLayer>(value).is_err());
    }
}
