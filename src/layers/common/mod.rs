//! Provides common neural network layers.
//!
//! For now the layers in common should be discribed as layers that are typical
//! layers for building neural networks but are not activation or loss layers.
pub use self::concat::{Concat, ConcatConfig};
pub use self::convolution::{Convolution, ConvolutionConfig};
pub use self::dropout::{Dropout, DropoutConfig};
pub use self::fully_connected::{FullyConnected, FullyConnectedConfig};
pub use self::lrn::{Lrn, LrnConfig};
pub use self::pooling::{Pooling, PoolingConfig};

pub mod concat;
pub mod convolution;
pub mod dropout;
pub mod fully_connected;
pub mod lrn;
pub mod pooling;
