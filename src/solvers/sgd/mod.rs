//! Provides update rules based on [Stochastic Gradient Descent][1].
//! [1]: https://en.wikipedia.org/wiki/Stochastic_gradient_descent
//!
//! The rules are applied per weight blob by the
//! [LearnableWeights][2] of every learnable layer.
//! [2]: ../../weight/struct.LearnableWeights.html

pub use self::momentum::Momentum;

pub mod momentum;
