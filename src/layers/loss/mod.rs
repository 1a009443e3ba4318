//! Provides methods to calculate the loss (cost) of some output.
//!
//! A loss function is also sometimes called cost function.
pub use self::softmax::SoftmaxLoss;

pub mod softmax;
