//! Feedforward Neural Network implementation.

use ndarray::Array2;
use rand::Rng;

use crate::error::{MLError, Result};
use crate::neural_networks::layers::DenseForward;
use crate::neural_networks::{DenseLayer, NetworkArchitecture, Optimizer};

/// Feedforward Neural Network
#[derive(Debug, Clone)]
pub struct FeedforwardNetwork {
    /// Network architecture
    architecture: NetworkArchitecture,

    /// Dense layers from input to output
    layers: Vec<DenseLayer>,
}

impl FeedforwardNetwork {
    /// Create a new feedforward network with freshly initialized weights
    pub fn new<R: Rng + ?Sized>(architecture: NetworkArchitecture, rng: &mut R) -> Result<Self> {
        architecture.validate()?;

        let mut layers = Vec::with_capacity(architecture.layers.len());
        let mut prev_size = architecture.input_dim;
        for layer in &architecture.layers {
            layers.push(DenseLayer::new(prev_size, layer.units, layer.activation, rng));
            prev_size = layer.units;
        }

        Ok(Self {
            architecture,
            layers,
        })
    }

    /// Reassemble a network from trained layers
    pub fn from_layers(architecture: NetworkArchitecture, layers: Vec<DenseLayer>) -> Result<Self> {
        architecture.validate()?;
        if layers.len() != architecture.layers.len() {
            return Err(MLError::model(format!(
                "architecture has {} layers but {} were supplied",
                architecture.layers.len(),
                layers.len()
            )));
        }

        let mut prev_size = architecture.input_dim;
        for (index, (layer, config)) in layers.iter().zip(&architecture.layers).enumerate() {
            if layer.input_size() != prev_size
                || layer.output_size() != config.units
                || layer.activation() != config.activation
            {
                return Err(MLError::model(format!(
                    "layer {} does not match the architecture",
                    index
                )));
            }
            prev_size = config.units;
        }

        Ok(Self {
            architecture,
            layers,
        })
    }

    /// Network architecture
    pub fn architecture(&self) -> &NetworkArchitecture {
        &self.architecture
    }

    /// Dense layers from input to output
    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    /// Total number of trainable scalars
    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(DenseLayer::parameter_count).sum()
    }

    /// Forward pass over a `[batch, input_dim]` matrix
    pub fn forward(&self, input: &Array2<f64>) -> Result<Array2<f64>> {
        let mut current = input.clone();
        for layer in &self.layers {
            current = layer.forward(&current)?;
        }
        Ok(current)
    }

    /// Output probabilities for each row of `input`
    pub fn predict(&self, input: &Array2<f64>) -> Result<Array2<f64>> {
        self.forward(input)
    }

    /// Mean loss of the network on `(input, targets)`
    pub fn evaluate_loss(&self, input: &Array2<f64>, targets: &Array2<f64>) -> Result<f64> {
        self.check_targets(input, targets)?;
        let predictions = self.forward(input)?;
        Ok(self
            .architecture
            .loss_function
            .compute(&predictions, targets))
    }

    /// Loss and parameter gradients by backpropagation.
    ///
    /// Gradients are ordered like the optimizer parameters: for each layer
    /// from input to output, the weight gradient then the bias gradient.
    pub fn gradients(
        &self,
        input: &Array2<f64>,
        targets: &Array2<f64>,
    ) -> Result<(f64, Vec<Array2<f64>>)> {
        self.check_targets(input, targets)?;

        let mut inputs: Vec<Array2<f64>> = Vec::with_capacity(self.layers.len());
        let mut caches: Vec<DenseForward> = Vec::with_capacity(self.layers.len());
        let mut current = input.clone();
        for layer in &self.layers {
            let cache = layer.forward_with_cache(&current)?;
            inputs.push(current);
            current = cache.output.clone();
            caches.push(cache);
        }

        let loss_function = self.architecture.loss_function;
        let loss = loss_function.compute(&current, targets);
        let mut upstream = loss_function.gradient(&current, targets);

        let mut gradients = Vec::with_capacity(self.layers.len() * 2);
        for ((layer, layer_input), cache) in self.layers.iter().zip(&inputs).zip(&caches).rev() {
            let (input_gradient, weight_gradient, bias_gradient) =
                layer.backward(layer_input, cache, &upstream);
            gradients.push(bias_gradient);
            gradients.push(weight_gradient);
            upstream = input_gradient;
        }
        gradients.reverse();

        Ok((loss, gradients))
    }

    /// One optimizer step on a mini-batch; returns the batch loss before the step
    pub fn train_batch(
        &mut self,
        input: &Array2<f64>,
        targets: &Array2<f64>,
        optimizer: &mut dyn Optimizer,
    ) -> Result<f64> {
        let (loss, gradients) = self.gradients(input, targets)?;
        if !loss.is_finite() {
            return Err(MLError::training(format!("loss diverged to {}", loss)));
        }

        let mut parameters: Vec<&mut Array2<f64>> = self
            .layers
            .iter_mut()
            .flat_map(DenseLayer::parameters_mut)
            .collect();
        optimizer.update(&mut parameters, &gradients)?;

        Ok(loss)
    }

    fn check_targets(&self, input: &Array2<f64>, targets: &Array2<f64>) -> Result<()> {
        if input.nrows() != targets.nrows() {
            return Err(MLError::shape_mismatch(format!(
                "{} input rows but {} target rows",
                input.nrows(),
                targets.nrows()
            )));
        }
        if targets.ncols() != self.architecture.output_dim() {
            return Err(MLError::shape_mismatch(format!(
                "targets have {} columns, network outputs {}",
                targets.ncols(),
                self.architecture.output_dim()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neural_networks::{ActivationType, AdamOptimizer, LossFunction};
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn create_test_network(seed: u64) -> FeedforwardNetwork {
        let architecture = NetworkArchitecture::classifier(4, 5, ActivationType::Tanh, 3);
        FeedforwardNetwork::new(architecture, &mut StdRng::seed_from_u64(seed)).unwrap()
    }

    fn batch() -> (Array2<f64>, Array2<f64>) {
        let input = array![
            [0.1, 0.2, -0.3, 0.4],
            [-0.5, 0.6, 0.7, -0.8],
            [0.9, -0.1, 0.2, 0.3]
        ];
        let targets = array![[1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]];
        (input, targets)
    }

    #[test]
    fn test_feedforward_network_creation() {
        let network = create_test_network(0);
        assert_eq!(network.layers().len(), 2);
        // 4 * 5 + 5 + 5 * 3 + 3
        assert_eq!(network.parameter_count(), 43);
    }

    #[test]
    fn test_forward_pass_yields_probabilities() {
        let network = create_test_network(0);
        let (input, _) = batch();
        let output = network.forward(&input).unwrap();

        assert_eq!(output.shape(), &[3, 3]);
        for row in output.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-10);
        }
    }

    #[test]
    fn test_same_seed_same_weights() {
        let a = create_test_network(11);
        let b = create_test_network(11);
        assert_eq!(a.layers(), b.layers());
    }

    #[test]
    fn test_gradients_match_finite_differences() {
        let network = create_test_network(3);
        let (input, targets) = batch();
        let (_, analytic) = network.gradients(&input, &targets).unwrap();
        assert_eq!(analytic.len(), 4);

        let h = 1e-6;
        for (param_index, gradient) in analytic.iter().enumerate() {
            for ((row, col), expected) in gradient.indexed_iter() {
                let mut plus = network.clone();
                let mut minus = network.clone();
                {
                    let layer = param_index / 2;
                    let which = param_index % 2;
                    plus.layers[layer].parameters_mut()[which][[row, col]] += h;
                    minus.layers[layer].parameters_mut()[which][[row, col]] -= h;
                }
                let numeric = (plus.evaluate_loss(&input, &targets).unwrap()
                    - minus.evaluate_loss(&input, &targets).unwrap())
                    / (2.0 * h);
                assert!(
                    (numeric - expected).abs() < 1e-6,
                    "param {} [{}, {}]: numeric {} vs analytic {}",
                    param_index,
                    row,
                    col,
                    numeric,
                    expected
                );
            }
        }
    }

    #[test]
    fn test_train_batch_reduces_loss() {
        let mut network = create_test_network(7);
        let (input, targets) = batch();
        let mut optimizer = AdamOptimizer::with_learning_rate(0.05);

        let initial = network.evaluate_loss(&input, &targets).unwrap();
        for _ in 0..50 {
            network.train_batch(&input, &targets, &mut optimizer).unwrap();
        }
        let trained = network.evaluate_loss(&input, &targets).unwrap();
        assert!(trained < initial);
    }

    #[test]
    fn test_target_shape_checked() {
        let network = create_test_network(0);
        let (input, _) = batch();
        let wrong = Array2::zeros((3, 2));
        assert!(matches!(
            network.gradients(&input, &wrong),
            Err(MLError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_from_layers_round_trip() {
        let network = create_test_network(2);
        let rebuilt = FeedforwardNetwork::from_layers(
            network.architecture().clone(),
            network.layers().to_vec(),
        )
        .unwrap();
        let (input, _) = batch();
        assert_eq!(
            network.forward(&input).unwrap(),
            rebuilt.forward(&input).unwrap()
        );

        let mut other = network.architecture().clone();
        other.loss_function = LossFunction::MeanSquaredError;
        other.layers[0].units = 6;
        assert!(FeedforwardNetwork::from_layers(other, network.layers().to_vec()).is_err());
    }
}
