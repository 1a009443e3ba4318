//! Provides the error type shared by layers, backends and the network.
//!
//! Every failure is fatal for the current step: nothing in this crate retries.
//! Minibatch exhaustion is not an error, the [data layer][data] restarts its
//! provider transparently.
//!
//! [data]: ../layers/utility/data/index.html
use std::error::Error as StdError;
use thiserror::Error;

/// Errors raised while assembling or executing a network.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed layer parameters, detected at assembly time.
    #[error("invalid configuration for `{layer}`: {message}")]
    Configuration {
        /// Name of the offending layer.
        layer: String,
        /// What is wrong with it.
        message: String,
    },
    /// A tensor operation received operands of incompatible rank or extent.
    #[error("shape mismatch in {operation}: {left:?} vs {right:?}")]
    ShapeMismatch {
        /// The operation that rejected its operands.
        operation: &'static str,
        /// Shape of the first operand.
        left: Vec<usize>,
        /// Shape of the second operand, or the expected shape.
        right: Vec<usize>,
    },
    /// Raised by ndarray when a reshape or dimensionality change is impossible.
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
    /// Topological traversal could not consume every included layer.
    #[error("network contains a cycle through layers {0:?}")]
    CyclicGraph(Vec<usize>),
    /// A layer id that was never added to the network.
    #[error("unknown layer id {0}")]
    UnknownUnit(usize),
    /// A declared input port was not produced by any predecessor.
    #[error("layer `{layer}` has no input for port `{port}`")]
    MissingInput {
        /// Name of the consuming layer.
        layer: String,
        /// The unresolved input port.
        port: String,
    },
    /// A declared output port received no gradient from any successor.
    #[error("layer `{layer}` received no gradient for port `{port}`")]
    MissingGradient {
        /// Name of the layer.
        layer: String,
        /// The output port without gradient.
        port: String,
    },
    /// Two predecessors of a layer emitted the same port.
    #[error("port `{port}` reaches layer `{layer}` from more than one predecessor")]
    DuplicatePort {
        /// Name of the consuming layer.
        layer: String,
        /// The ambiguous port.
        port: String,
    },
    /// State that only exists after initialization or a forward pass was requested.
    #[error("{0} is not available")]
    Uninitialized(&'static str),
    /// A data provider produced no minibatch right after being reset.
    #[error("data provider yielded no minibatches")]
    EmptyDataset,
    /// Reading the next minibatch failed.
    #[error("failed to read minibatch")]
    Data(#[source] Box<dyn StdError + Send + Sync>),
    /// Wraps an error raised inside a layer with the layer's name.
    #[error("layer `{layer}` failed")]
    Unit {
        /// Name of the failing layer.
        layer: String,
        /// The underlying error.
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Attach the name of the layer the error was raised in.
    pub fn in_layer(self, layer: &str) -> Error {
        match self {
            // already carries a layer name
            e @ Error::Unit { .. }
            | e @ Error::Configuration { .. }
            | e @ Error::MissingInput { .. }
            | e @ Error::MissingGradient { .. }
            | e @ Error::DuplicatePort { .. } => e,
            e => Error::Unit {
                layer: layer.to_owned(),
                source: Box::new(e),
            },
        }
    }

    /// The innermost error, looking through [Unit](#variant.Unit) wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Unit { source, .. } => source.root(),
            e => e,
        }
    }

    pub(crate) fn config<S: Into<String>>(layer: &str, message: S) -> Error {
        Error::Configuration {
            layer: layer.to_owned(),
            message: message.into(),
        }
    }

    pub(crate) fn shape(operation: &'static str, left: &[usize], right: &[usize]) -> Error {
        Error::ShapeMismatch {
            operation,
            left: left.to_vec(),
            right: right.to_vec(),
        }
    }
}

/// Result type used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_worker_errors_once() {
        let err = Error::shape("add", &[2, 3], &[3, 2]).in_layer("fc1").in_layer("outer");
        match &err {
            Error::Unit { layer, .. } => assert_eq!(layer, "fc1"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(err.root(), Error::ShapeMismatch { operation: "add", .. }));
    }

    #[test]
    fn named_errors_stay_unwrapped() {
        let err = Error::config("pool1", "stride must be positive").in_layer("pool1");
        assert!(matches!(err, Error::Configuration { .. }));
        assert_eq!(err.to_string(), "invalid configuration for `pool1`: stride must be positive");
    }
}
