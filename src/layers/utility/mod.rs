//! Provides various helpful layers, which might be not directly related to
//! neural networks in general.
//!
//! These layers do not have to necesarrely manipulate the data flowing through
//! them and might have
//! no effect on the Networks' capabilities to learn (e.g. measuring accuracy) but obey all
//! the rules of a [Layer][1].
//! The type of these layers can vary a lot. From evaluation to
//! specific data access layers feeding minibatches into the network.
//!
//! [1]: ../../layer/index.html
pub use self::accuracy::Accuracy;
pub use self::data::{Data, DataConfig};

pub mod accuracy;
pub mod data;
