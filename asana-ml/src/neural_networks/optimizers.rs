//! Optimizer implementations for neural networks.

use ndarray::Array2;

use crate::error::{MLError, Result};

/// Generic optimizer trait
pub trait Optimizer: Send {
    /// Update parameters in place using gradients of the same shapes
    fn update(
        &mut self,
        parameters: &mut [&mut Array2<f64>],
        gradients: &[Array2<f64>],
    ) -> Result<()>;

    /// Reset optimizer state
    fn reset(&mut self);

    /// Get learning rate
    fn learning_rate(&self) -> f64;

    /// Set learning rate
    fn set_learning_rate(&mut self, lr: f64);
}

fn check_shapes(parameters: &[&mut Array2<f64>], gradients: &[Array2<f64>]) -> Result<()> {
    if parameters.len() != gradients.len() {
        return Err(MLError::shape_mismatch(format!(
            "{} parameters but {} gradients",
            parameters.len(),
            gradients.len()
        )));
    }
    for (i, (param, grad)) in parameters.iter().zip(gradients).enumerate() {
        if param.shape() != grad.shape() {
            return Err(MLError::shape_mismatch(format!(
                "parameter {} has shape {:?} but gradient has {:?}",
                i,
                param.shape(),
                grad.shape()
            )));
        }
    }
    Ok(())
}

/// Stochastic Gradient Descent optimizer
#[derive(Debug, Clone)]
pub struct SGDOptimizer {
    learning_rate: f64,
    momentum: f64,
    velocity: Vec<Array2<f64>>,
}

impl SGDOptimizer {
    /// Create a new SGD optimizer
    ///
    /// # Arguments
    /// * `learning_rate` - Learning rate for gradient descent (typically 0.01-0.1)
    /// * `momentum` - Momentum factor for acceleration (0.0 for no momentum, typically 0.9)
    pub fn new(learning_rate: f64, momentum: f64) -> Self {
        Self {
            learning_rate,
            momentum,
            velocity: Vec::new(),
        }
    }
}

impl Optimizer for SGDOptimizer {
    fn update(
        &mut self,
        parameters: &mut [&mut Array2<f64>],
        gradients: &[Array2<f64>],
    ) -> Result<()> {
        check_shapes(parameters, gradients)?;
        self.velocity.resize_with(parameters.len(), || Array2::zeros((0, 0)));

        for (i, (param, grad)) in parameters.iter_mut().zip(gradients.iter()).enumerate() {
            if self.velocity[i].shape() != param.shape() {
                self.velocity[i] = Array2::zeros(param.raw_dim());
            }

            if self.momentum > 0.0 {
                // v = momentum * v - lr * grad
                self.velocity[i] = &self.velocity[i] * self.momentum - grad * self.learning_rate;
                **param += &self.velocity[i];
            } else {
                **param -= &(grad * self.learning_rate);
            }
        }

        Ok(())
    }

    fn reset(&mut self) {
        for v in &mut self.velocity {
            v.fill(0.0);
        }
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, lr: f64) {
        self.learning_rate = lr;
    }
}

/// Adam optimizer
#[derive(Debug, Clone)]
pub struct AdamOptimizer {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    t: usize,            // Time step
    m: Vec<Array2<f64>>, // First moment
    v: Vec<Array2<f64>>, // Second moment
}

impl AdamOptimizer {
    /// Create a new Adam optimizer with custom parameters
    ///
    /// # Arguments
    /// * `learning_rate` - Step size
    /// * `beta1` - Exponential decay rate for first moment (typically 0.9)
    /// * `beta2` - Exponential decay rate for second moment (typically 0.999)
    /// * `epsilon` - Small constant for numerical stability (typically 1e-7)
    pub fn new(learning_rate: f64, beta1: f64, beta2: f64, epsilon: f64) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            t: 0,
            m: Vec::new(),
            v: Vec::new(),
        }
    }

    /// Adam with β1 = 0.9, β2 = 0.999, ε = 1e-7
    pub fn with_learning_rate(learning_rate: f64) -> Self {
        Self::new(learning_rate, 0.9, 0.999, 1e-7)
    }

    /// Number of updates applied since creation or the last reset
    pub fn steps(&self) -> usize {
        self.t
    }
}

impl Default for AdamOptimizer {
    fn default() -> Self {
        Self::with_learning_rate(0.001)
    }
}

impl Optimizer for AdamOptimizer {
    fn update(
        &mut self,
        parameters: &mut [&mut Array2<f64>],
        gradients: &[Array2<f64>],
    ) -> Result<()> {
        check_shapes(parameters, gradients)?;
        self.m.resize_with(parameters.len(), || Array2::zeros((0, 0)));
        self.v.resize_with(parameters.len(), || Array2::zeros((0, 0)));
        self.t += 1;

        let bias_correction1 = 1.0 - self.beta1.powi(self.t as i32);
        let bias_correction2 = 1.0 - self.beta2.powi(self.t as i32);

        for (i, (param, grad)) in parameters.iter_mut().zip(gradients.iter()).enumerate() {
            if self.m[i].shape() != param.shape() {
                self.m[i] = Array2::zeros(param.raw_dim());
                self.v[i] = Array2::zeros(param.raw_dim());
            }

            self.m[i] = &self.m[i] * self.beta1 + grad * (1.0 - self.beta1);
            self.v[i] = &self.v[i] * self.beta2 + &grad.map(|x| x * x) * (1.0 - self.beta2);

            let m_hat = &self.m[i] / bias_correction1;
            let v_hat = &self.v[i] / bias_correction2;

            let update = &m_hat / &(v_hat.map(|x| x.sqrt()) + self.epsilon);
            **param -= &(&update * self.learning_rate);
        }

        Ok(())
    }

    fn reset(&mut self) {
        self.t = 0;
        for m in &mut self.m {
            m.fill(0.0);
        }
        for v in &mut self.v {
            v.fill(0.0);
        }
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, lr: f64) {
        self.learning_rate = lr;
    }
}
