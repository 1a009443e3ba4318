//! Provides common utility functions
use std::rc::Rc;
use std::sync::{Arc, RwLock};

use crate::backend::*;

/// Shared Lock used for our data providers
pub type ArcLock<T> = Arc<RwLock<T>>;

/// Create a simple native backend.
///
/// This is handy for tests and for hosts without any other device.
#[cfg(feature = "native")]
pub fn native_backend() -> Rc<Native> {
    Rc::new(Native::new())
}

/// Encapsulates all traits required by Solvers.
pub trait SolverOps: IBackend + Elementwise {}

impl<T: IBackend + Elementwise> SolverOps for T {}

/// Encapsulates all traits used in Layers.
pub trait LayerOps:
    SolverOps + Activation + Blas + Shaping + Convolution + Pooling + Lrn + Softmax + Random
{
}

impl<T: SolverOps + Activation + Blas + Shaping + Convolution + Pooling + Lrn + Softmax + Random> LayerOps for T {}
