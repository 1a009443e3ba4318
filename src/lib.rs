//! Cambium is an open, modular framework for training convolutional and fully-connected networks
//! as graphs of compute units, sharing concepts from Caffe.
//!
//! All numerical work goes through a small set of [backend traits][backend], so a Network can
//! run on any device that implements them. Cambium ships a [native][native] implementation on
//! top of `ndarray` for your host CPU.
//!
//! ## Architecture
//!
//! Cambium's [Network][network] is a directed acyclic graph of [layers][layers], making
//! operations over numerical data.
//!
//! Every layer consumes tensors on named input ports and produces tensors on named output ports.
//! At execution time, the Network runs the layers in dependency order and hands each one the
//! outputs of its predecessors. On a backward pass, the Network passes the derivatives inverted
//! through the graph, summing the gradients of every consumer of a port.
//!
//! Layers, the building block of a Cambium Network, are small units, describing computation over
//! numerical input data. Any Layer can be grouped in one of four Layer types which are closer
//! defined at the [Layers page][layers]. Layers can be restricted to the training or the test
//! [phase][phase]; a restricted layer is skipped in the other phase without stalling its
//! neighbours.
//!
//! Tensors are reference-counted n-dimensional arrays with the batch as the last axis, see
//! [tensor][tensor].
//!
//! The learning and optimization of the Network happens at the [Solver][solver] and is decoupled
//! from the Network making the setup clean and flexible. One of the four layer types is a Loss
//! Layer, which is used for the interaction of Network and Solver. The Network produces the loss
//! and gradients, which the Solver uses to optimize the Network through parameter updates.
//!
//! ## Examples
//!
//! ```
//! # use std::sync::{Arc, RwLock};
//! # use cambium::data::InMemoryProvider;
//! # use cambium::layer::{LayerConfig, LayerType};
//! # use cambium::layers::*;
//! # use cambium::network::{Network, NetworkConfig};
//! # use cambium::solver::{Solver, SolverConfig};
//! # use cambium::tensor::from_shape_vec;
//! # use cambium::util::native_backend;
//! # fn main() -> cambium::Result<()> {
//! let samples = from_shape_vec(&[4, 2], vec![0., 1., 1., 0., 1., 1., 0., 0.])?;
//! let provider = InMemoryProvider::new(samples, vec![1, 1, 0, 0], 2, 2)?;
//! let data = DataConfig { sample_shape: vec![2], provider: Arc::new(RwLock::new(provider)) };
//!
//! let mut cfg = NetworkConfig::new("xor");
//! cfg.add_layer(LayerConfig::new("data", data).add_output("data").add_output("label"));
//! cfg.add_layer(LayerConfig::new("ip", FullyConnectedConfig { num_output: 2 }).add_input("data").add_output("ip"));
//! cfg.add_layer(LayerConfig::new("loss", LayerType::SoftmaxLoss).add_input("ip").add_input("label").add_output("prob"));
//!
//! let network = Network::from_config(native_backend(), &cfg)?;
//! let mut solver = Solver::from_network(network, SolverConfig::default());
//! let loss = solver.train_minibatch()?;
//! assert!(loss > 0.);
//! # Ok(())
//! # }
//! ```
//!
//! [backend]: ./backend/index.html
//! [native]: ./backend/native/index.html
//! [network]: ./network/index.html
//! [layers]: ./layers/index.html
//! [phase]: ./layer/enum.Phase.html
//! [tensor]: ./tensor/index.html
//! [solver]: ./solver/index.html
#![deny(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]

#[macro_use]
extern crate log;

pub use crate::error::{Error, Result};

pub mod backend;
pub mod data;
pub mod error;
#[macro_use]
pub mod layer;
pub mod layers;
pub mod network;
pub mod solver;
pub mod solvers;
pub mod tensor;
pub mod util;
pub mod weight;
