//! Activation functions for neural networks.

use ndarray::{Array2, Axis};

use crate::neural_networks::ActivationType;

/// Activation function utilities
pub struct Activations;

impl Activations {
    /// Apply activation function
    pub fn apply(input: &Array2<f64>, activation: &ActivationType) -> Array2<f64> {
        match activation {
            ActivationType::Linear => input.clone(),
            ActivationType::ReLU => input.map(|x| x.max(0.0)),
            ActivationType::LeakyReLU { alpha } => {
                input.map(|x| if *x > 0.0 { *x } else { alpha * x })
            }
            ActivationType::Sigmoid => input.map(|x| 1.0 / (1.0 + (-x).exp())),
            ActivationType::Tanh => input.map(|x| x.tanh()),
            ActivationType::Softmax => Self::softmax(input),
        }
    }

    /// Element-wise derivative with respect to the pre-activation.
    ///
    /// Softmax is not element-wise; use [`Activations::backward`] for it.
    pub fn derivative(input: &Array2<f64>, activation: &ActivationType) -> Array2<f64> {
        match activation {
            ActivationType::Linear => Array2::ones(input.raw_dim()),
            ActivationType::ReLU => input.map(|x| if *x > 0.0 { 1.0 } else { 0.0 }),
            ActivationType::LeakyReLU { alpha } => {
                input.map(|x| if *x > 0.0 { 1.0 } else { *alpha })
            }
            ActivationType::Sigmoid => {
                let sigmoid = Self::apply(input, activation);
                sigmoid.map(|x| x * (1.0 - x))
            }
            ActivationType::Tanh => {
                let tanh = Self::apply(input, activation);
                tanh.map(|x| 1.0 - x * x)
            }
            ActivationType::Softmax => Array2::ones(input.raw_dim()),
        }
    }

    /// Gradient with respect to the pre-activation `input`, given the
    /// gradient with respect to the activated `output`.
    pub fn backward(
        input: &Array2<f64>,
        output: &Array2<f64>,
        output_gradient: &Array2<f64>,
        activation: &ActivationType,
    ) -> Array2<f64> {
        match activation {
            // Jacobian-vector product per row: s * (g - <g, s>)
            ActivationType::Softmax => {
                let dot = (output_gradient * output)
                    .sum_axis(Axis(1))
                    .insert_axis(Axis(1));
                output * &(output_gradient - &dot)
            }
            _ => output_gradient * &Self::derivative(input, activation),
        }
    }

    /// Numerically stable softmax
    fn softmax(input: &Array2<f64>) -> Array2<f64> {
        let mut result = input.clone();
        for mut row in result.rows_mut() {
            let max_val = row.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
            for val in row.iter_mut() {
                *val = (*val - max_val).exp();
            }
            let sum: f64 = row.sum();
            for val in row.iter_mut() {
                *val /= sum;
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn test_relu_activation() {
        let input = Array2::from_shape_vec((1, 3), vec![-1.0, 0.0, 1.0]).unwrap();
        let output = Activations::apply(&input, &ActivationType::ReLU);

        assert_eq!(output[[0, 0]], 0.0);
        assert_eq!(output[[0, 1]], 0.0);
        assert_eq!(output[[0, 2]], 1.0);
    }

    #[test]
    fn test_sigmoid_activation() {
        let input = Array2::from_shape_vec((1, 3), vec![-1000.0, 0.0, 1000.0]).unwrap();
        let output = Activations::apply(&input, &ActivationType::Sigmoid);

        assert!(output[[0, 0]] < 0.01);
        assert!((output[[0, 1]] - 0.5).abs() < 0.01);
        assert!(output[[0, 2]] > 0.99);
    }

    #[test]
    fn test_softmax_activation() {
        let input = Array2::from_shape_vec((2, 3), vec![1.0, 2.0, 3.0, 1000.0, 1000.0, 1000.0])
            .unwrap();
        let output = Activations::apply(&input, &ActivationType::Softmax);

        for row in output.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-10);
            assert!(row.iter().all(|p| *p > 0.0));
        }
        assert!(output[[0, 2]] > output[[0, 1]]);
        assert!(output[[0, 1]] > output[[0, 0]]);
        assert!((output[[1, 0]] - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_leaky_relu() {
        let input = Array2::from_shape_vec((1, 3), vec![-2.0, 0.0, 2.0]).unwrap();
        let alpha = 0.1;
        let output = Activations::apply(&input, &ActivationType::LeakyReLU { alpha });

        assert_eq!(output[[0, 0]], -0.2);
        assert_eq!(output[[0, 1]], 0.0);
        assert_eq!(output[[0, 2]], 2.0);
    }

    #[test]
    fn test_softmax_backward_matches_finite_difference() {
        let input = array![[0.3, -1.2, 0.8]];
        let upstream = array![[0.5, -0.25, 1.0]];
        let output = Activations::apply(&input, &ActivationType::Softmax);
        let analytic =
            Activations::backward(&input, &output, &upstream, &ActivationType::Softmax);

        let h = 1e-6;
        for j in 0..3 {
            let mut plus = input.clone();
            let mut minus = input.clone();
            plus[[0, j]] += h;
            minus[[0, j]] -= h;
            let f = |x: &Array2<f64>| {
                (Activations::apply(x, &ActivationType::Softmax) * &upstream).sum()
            };
            let numeric = (f(&plus) - f(&minus)) / (2.0 * h);
            assert!((numeric - analytic[[0, j]]).abs() < 1e-6);
        }
    }
}
