//! Provides the training and evaluation loop around a [Network][network].
//!
//! The Solver runs one minibatch at a time: a forward and a backward pass in
//! the [TRAIN][phase] phase, followed by a weight update with the
//! hyperparameters of the current iteration. The update rule itself is
//! [SGD with momentum][momentum].
//!
//! [network]: ../network/index.html
//! [phase]: ../layer/enum.Phase.html
//! [momentum]: ../solvers/sgd/momentum/index.html
use crate::error::Result;
use crate::layer::Phase;
use crate::network::Network;
use crate::util::LayerOps;

#[derive(Debug, Copy, Clone, PartialEq)]
/// Hyperparameters of one weight update.
pub struct UpdateConfig {
    /// Learning rate of the current iteration.
    pub learning_rate: f32,
    /// Global weight decay.
    pub weight_decay: f32,
    /// Momentum multiplier.
    pub momentum: f32,
    /// Number of samples the gradients were summed over.
    pub batch_size: usize,
}

#[derive(Debug)]
/// Solver that optimizes a [Network][1] with momentum SGD.
/// [1]: ../network/struct.Network.html
pub struct Solver<B: LayerOps> {
    net: Network<B>,
    config: SolverConfig,

    /// The current iteration / number of times weights have been updated
    iter: usize,
}

impl<B: LayerOps> Solver<B> {
    /// Create a Solver that trains `net`.
    pub fn from_network(net: Network<B>, config: SolverConfig) -> Solver<B> {
        info!("Initializing solver {} for network {}", config.name, net.name);
        Solver { net, config, iter: 0 }
    }

    /// Train the network with one minibatch.
    ///
    /// Returns the summed loss of the TRAIN loss layers before the update.
    pub fn train_minibatch(&mut self) -> Result<f32> {
        self.net.forward(Phase::Train)?;
        self.net.backend().synchronize()?;
        let loss = self.net.loss(Phase::Train);

        self.net.backward(Phase::Train)?;
        let batch_size = self.net.batch_size(Phase::Train).unwrap_or(self.config.minibatch_size);
        let update = UpdateConfig {
            batch_size,
            ..self.config.update_config(self.iter)
        };
        self.net.weight_update(&update)?;

        if self.config.display > 0 && self.iter % self.config.display == 0 {
            info!("Iteration {}, loss = {}, lr = {}", self.iter, loss, update.learning_rate);
        }
        self.iter += 1;
        Ok(loss)
    }

    /// Run `iterations` forward passes in the TEST phase.
    ///
    /// Loss and accuracy are averaged over the iterations; the accuracy of
    /// each iteration is the mean over the accuracy layers.
    pub fn test(&mut self, iterations: usize) -> Result<TestResult> {
        let mut loss = 0f32;
        let mut accuracy = 0f32;
        let mut measured = 0usize;
        for _ in 0..iterations {
            self.net.forward(Phase::Test)?;
            self.net.backend().synchronize()?;
            loss += self.net.loss(Phase::Test);

            let values: Vec<f32> = self
                .net
                .accuracy_layers()
                .into_iter()
                .filter(|&id| self.net.layers()[id].is_included(Phase::Test))
                .filter_map(|id| self.net.layers()[id].worker.accuracy())
                .collect();
            if !values.is_empty() {
                accuracy += values.iter().sum::<f32>() / values.len() as f32;
                measured += 1;
            }
        }

        let result = TestResult {
            loss: if iterations > 0 { loss / iterations as f32 } else { 0f32 },
            accuracy: if measured > 0 { Some(accuracy / measured as f32) } else { None },
        };
        info!("Test after {} iterations: {:?}", self.iter, result);
        Ok(result)
    }

    /// Returns the network trained by the solver.
    ///
    /// This is the recommended method to get a usable trained network.
    pub fn network(&self) -> &Network<B> {
        &self.net
    }

    /// Returns the network trained by the solver.
    ///
    /// This is the recommended method to get a trained network,
    /// if you want to alter the network. Keep in mind that altering the network
    /// might render the solver unusable and continuing training the network with it will yield
    /// unexpected results.
    pub fn mut_network(&mut self) -> &mut Network<B> {
        &mut self.net
    }

    /// The number of weight updates done so far.
    pub fn iter(&self) -> usize {
        self.iter
    }

    /// The configuration of the solver.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
/// Averages measured by [Solver::test][1].
/// [1]: ./struct.Solver.html#method.test
pub struct TestResult {
    /// Mean loss per iteration.
    pub loss: f32,
    /// Mean accuracy, `None` when no accuracy layer ran.
    pub accuracy: Option<f32>,
}

#[derive(Debug, Clone)]
/// Configuration for a Solver
pub struct SolverConfig {
    /// Name of the solver.
    pub name: String,
    /// Batch size used for the update when the network has no data layer.
    ///
    /// Default: 1
    pub minibatch_size: usize,
    /// The learning rate policy to be used.
    ///
    /// Default: Fixed
    pub lr_policy: LRPolicy,
    /// The base learning rate.
    ///
    /// Default: 0.01
    pub base_lr: f32,
    /// gamma as used in the calculation of most learning rate policies.
    ///
    /// Default: 0.1
    pub gamma: f32,
    /// The stepsize used in Step learning policies.
    ///
    /// Default: 10
    pub stepsize: usize,
    /// The global [weight decay][1] multiplier for [regularization][2].
    /// [1]: http://www.alglib.net/dataanalysis/improvinggeneralization.php#header3
    /// [2]: https://cs231n.github.io/neural-networks-2/#reg
    ///
    /// Regularization can prevent [overfitting][3].
    ///
    /// If set to `None` no regularization will be performed.
    ///
    /// [3]: https://cs231n.github.io/neural-networks-2/#reg
    pub weight_decay: Option<f32>,
    /// The [momentum][1] multiplier for [SGD solvers][2].
    /// [1]: https://en.wikipedia.org/wiki/Stochastic_gradient_descent#Momentum
    /// [2]: ../solvers/sgd/index.html
    ///
    /// The value should always be between 0 and 1 and dictates how much of the previous
    /// gradient update will be added to the current one.
    ///
    /// Default: 0
    pub momentum: f32,
    /// Log the loss every `display` iterations. 0 disables it.
    ///
    /// Default: 0
    pub display: usize,
}

impl Default for SolverConfig {
    fn default() -> SolverConfig {
        SolverConfig {
            name: "".to_owned(),

            minibatch_size: 1,

            lr_policy: LRPolicy::Fixed,
            base_lr: 0.01f32,
            gamma: 0.1f32,
            stepsize: 10,

            weight_decay: None,

            momentum: 0f32,
            display: 0,
        }
    }
}

impl SolverConfig {
    /// Return the learning rate for a supplied iteration.
    ///
    /// The way the learning rate is calculated depends on the configured [LRPolicy][1].
    ///
    /// [1]: ./enum.LRPolicy.html
    pub fn get_learning_rate(&self, iter: usize) -> f32 {
        match self.lr_policy {
            LRPolicy::Fixed => self.base_lr,
            LRPolicy::Step => {
                let current_step = self.step(iter);
                self.base_lr * self.gamma.powi(current_step as i32)
            }
            LRPolicy::Exp => self.base_lr * self.gamma.powi(iter as i32),
        }
    }

    /// The hyperparameters of the update at iteration `iter`.
    pub fn update_config(&self, iter: usize) -> UpdateConfig {
        UpdateConfig {
            learning_rate: self.get_learning_rate(iter),
            weight_decay: self.weight_decay.unwrap_or(0f32),
            momentum: self.momentum,
            batch_size: self.minibatch_size,
        }
    }

    /// Return current step at iteration `iter`.
    ///
    /// Small helper for learning rate calculation.
    fn step(&self, iter: usize) -> usize {
        if self.stepsize == 0 {
            return 0;
        }
        iter / self.stepsize
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
/// Learning Rate Policy for a [Solver][1]
/// [1]: ./struct.Solver.html
///
/// The variables mentioned below are defined in the [SolverConfig][2] apart from
/// iter, which is the current iteration of the solver, that is supplied as a parameter
/// for the learning rate calculation.
///
/// [2]: ./struct.SolverConfig.html
pub enum LRPolicy {
    /// always return base_lr
    Fixed,
    /// learning rate decays every `step` iterations.
    /// return base_lr * gamma ^ (floor(iter / step))
    Step,
    /// return base_lr * gamma ^ iter
    Exp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_config_defaults_to_no_decay() {
        let cfg = SolverConfig {
            momentum: 0.9,
            ..SolverConfig::default()
        };
        let update = cfg.update_config(3);
        assert_eq!(update.weight_decay, 0.);
        assert_eq!(update.momentum, 0.9);
        assert_eq!(update.batch_size, 1);
        assert_eq!(update.learning_rate, 0.01);
    }

    #[test]
    fn zero_stepsize_never_steps() {
        let cfg = SolverConfig {
            lr_policy: LRPolicy::Step,
            stepsize: 0,
            base_lr: 2.,
            ..SolverConfig::default()
        };
        assert_eq!(cfg.get_learning_rate(50), 2.);
    }
}
