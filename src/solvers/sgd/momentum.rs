//! A [Stochastic Gradient Descent with Momentum][1]
//! [1]: https://en.wikipedia.org/wiki/Stochastic_gradient_descent#Momentum
//!
//! Momentum in solving neural networks works similar to
//! they way it does in physics.
//! If you travel into a a direction with a high velocity,
//! it becomes very hard to change (or reverse)
//! the direction in which you are moving.
//!
//! Similarly when adjusting gradients during solving,
//! keeping a part of the previous gradient update can make solving faster,
//! since if you keep adjusting the gradients
//! into the same direction you will reach the optimum faster.
//! It also makes solving more stable.
//!
//! For a blob with learning rate multiplier `lr_mult` and weight decay
//! multiplier `decay_mult` one step computes
//!
//! ```text
//! delta  = momentum * delta
//!        - (lr * lr_mult / batch_size) * gradient
//!        - (lr * lr_mult * weight_decay * decay_mult) * weight
//! weight = weight + delta
//! ```
use crate::error::{Error, Result};
use crate::solver::UpdateConfig;
use crate::tensor::Tensor;
use crate::util::SolverOps;
use crate::weight::WeightConfig;

#[derive(Debug, Clone, Default)]
/// Stochastic Gradient Descent with Momentum.
///
/// Keeps the update of the previous iteration for one blob.
/// See [module description][1] for more information.
/// [1]: ./index.html
pub struct Momentum {
    /// The gradient update from the previous iteration.
    history: Option<Tensor>,
}

impl Momentum {
    /// Create a new SGD Momentum history without any previous update.
    pub fn new() -> Momentum {
        Momentum { history: None }
    }

    /// The update applied in the previous iteration.
    pub fn history(&self) -> Option<&Tensor> {
        self.history.as_ref()
    }

    /// Compute the new value of `weight` and remember the applied update.
    ///
    /// The history starts out as zeros shaped like the gradient. It is only
    /// replaced once the update succeeded.
    pub fn compute_update<B: SolverOps>(
        &mut self,
        backend: &B,
        config: &UpdateConfig,
        blob: &WeightConfig,
        weight: &Tensor,
        gradient: &Tensor,
    ) -> Result<Tensor> {
        if config.batch_size == 0 {
            return Err(Error::config("momentum", "batch_size must be positive"));
        }
        let local_lr = config.learning_rate * blob.lr_mult();
        let local_decay = config.weight_decay * blob.decay_mult();

        let history = match self.history {
            Some(ref history) => history.clone(),
            None => backend.zeros(gradient.shape()),
        };
        let delta = backend.axpby(
            -local_lr / config.batch_size as f32,
            gradient,
            config.momentum,
            &history,
        )?;
        let delta = backend.axpby(-local_lr * local_decay, weight, 1f32, &delta)?;
        let updated = backend.add(weight, &delta)?;
        self.history = Some(delta);

        Ok(updated)
    }
}
