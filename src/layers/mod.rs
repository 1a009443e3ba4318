//! Provides the fundamental units of computation for the [Network][1].
//! [1]: ../network/index.html
//!
//! These layers provide different type of operations to the tensors
//! that flow through them.
//! The operations provided by the layers can be
//! roughly grouped into four categories:
//!
//! * [__Activation__][mod_activation]</br>
//! Activation Layers provide element-wise operations and produce one output
//! of the same size as the input.
//! It can be seen as a synonym to nonlinear [Activation Functions][2].
//!
//! * [__Common__][mod_common]</br>
//! Common Layers can differ in their connectivity and behavior and are
//! typically all network layer
//! types which are not covered by activation or loss layers.
//! Examples would be fully connected
//! layers, convolutional layers, pooling, dropout and concatenation.
//!
//! * [__Loss__][mod_loss]</br>
//! Loss Layers compare an output to a target value and assign cost to
//! minimize. Loss Layers are often the last layer in a [Network][1].
//!
//! * [__Utility__][mod_utility]</br>
//! Utility Layers provide all kind of helpful functionality, which might not
//! be directly related
//! to machine learning and neural nets. This could be operations for
//! feeding
//! minibatches into the network or measuring accuracy.
//! Utility Layers follow the general behavior of a layer, like the other types
//! do.
//!
//! For more information about how these layers work together, see the
//! documentation for the general [Layer module][3].
//!
//! [2]: https://en.wikipedia.org/wiki/Activation_function
//! [3]: ../layer/index.html
//!
//! [mod_activation]: ./activation/index.html
//! [mod_common]: ./common/index.html
//! [mod_loss]: ./loss/index.html
//! [mod_utility]: ./utility/index.html

#[allow(unused_import_braces)]
pub use self::activation::{
    Linear,
    ReLU,
    Sigmoid,
    TanH,
};

#[allow(unused_import_braces)]
pub use self::common::{
    Concat, ConcatConfig,
    Convolution, ConvolutionConfig,
    Dropout, DropoutConfig,
    FullyConnected, FullyConnectedConfig,
    Lrn, LrnConfig,
    Pooling, PoolingConfig,
};
pub use crate::backend::PoolingMode;

#[allow(unused_import_braces)]
pub use self::loss::{
    SoftmaxLoss,
};

#[allow(unused_import_braces)]
pub use self::utility::{
    Accuracy,
    Data, DataConfig,
};

pub mod activation;
pub mod common;
pub mod loss;
pub mod utility;
