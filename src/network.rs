//! Provides a Network graph that executes [Layers][layers] in dependency order.
//!
//! A Network owns its layers in an arena: layer ids are positions in
//! insertion order and never change. Edges point from a producing layer to a
//! consuming layer. On the forward pass a layer receives the merged outputs of
//! its direct predecessors; on the backward pass it receives, per output port,
//! the sum of the gradients its successors computed for that port.
//!
//! Layers restricted to a [Phase][phase] are skipped in the other phase. Their
//! edges are ignored when ordering the layers, so their neighbours still run.
//!
//! ## Assembly
//!
//! A Network is either wired by hand with [add_layer](./struct.Network.html#method.add_layer)
//! and [connect](./struct.Network.html#method.connect), or built from a
//! [NetworkConfig](./struct.NetworkConfig.html), which connects layers through
//! the names of their ports.
//!
//! ## Examples
//!
//! ```
//! # use cambium::layer::{LayerConfig, LayerType};
//! # use cambium::network::{Network, NetworkConfig};
//! # use cambium::util::native_backend;
//! let mut cfg = NetworkConfig::new("example");
//! cfg.add_layer(LayerConfig::new("sig", LayerType::Sigmoid).add_input("x").add_output("y"));
//! cfg.add_layer(LayerConfig::new("relu", LayerType::ReLU).add_input("y").add_output("y"));
//! # let network = Network::from_config(native_backend(), &cfg);
//! # assert!(network.is_err()); // nothing produces `x`
//! ```
//!
//! [layers]: ../layers/index.html
//! [phase]: ../layer/enum.Phase.html
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::layer::{Layer, LayerConfig, Phase};
use crate::solver::UpdateConfig;
use crate::tensor::{self, Ports};
use crate::util::LayerOps;

#[derive(Debug)]
/// Directed acyclic graph of layers sharing one backend.
pub struct Network<B: LayerOps> {
    /// Identifies the Network
    ///
    /// The name is mainly used for logging purposes.
    pub name: String,
    backend: Rc<B>,

    layers: Vec<Layer<B>>,
    adjacent: Vec<Vec<usize>>,
    reverse_adjacent: Vec<Vec<usize>>,
    name_to_ids: HashMap<String, Vec<usize>>,
    // per layer: input port -> producers, most recent first
    bindings: Vec<HashMap<String, Vec<usize>>>,

    // results of the last pass, per layer id
    outputs: Vec<Ports>,
    input_gradients: Vec<Ports>,
}

impl<B: LayerOps> Network<B> {
    /// Create an empty Network.
    pub fn new(backend: Rc<B>, name: &str) -> Network<B> {
        Network {
            name: name.to_owned(),
            backend,

            layers: Vec::new(),
            adjacent: Vec::new(),
            reverse_adjacent: Vec::new(),
            name_to_ids: HashMap::new(),
            bindings: Vec::new(),

            outputs: Vec::new(),
            input_gradients: Vec::new(),
        }
    }

    /// Create a Network from a [NetworkConfig][1].
    /// [1]: ./struct.NetworkConfig.html
    ///
    /// Every input port is connected to the most recent earlier layer that
    /// outputs a port of the same name. When that layer is restricted to a
    /// phase, earlier producers for the other phase are connected as well, up
    /// to the first producer that runs in every phase. In each phase the port
    /// is then read from the most recent of those producers that runs. This
    /// lets in-place layers (same input and output port) and per-phase layers
    /// share port names.
    ///
    /// Fails with a configuration error when a layer runs in a phase in which
    /// none of the producers of one of its input ports runs.
    pub fn from_config(backend: Rc<B>, config: &NetworkConfig) -> Result<Network<B>> {
        let mut network = Network::new(backend, &config.name);
        let mut producers: HashMap<&str, Vec<usize>> = HashMap::new();

        for layer_config in &config.layers {
            let id = network.add_layer(Layer::from_config(layer_config)?);

            for port in &layer_config.inputs {
                let candidates = producers.get(port.as_str()).ok_or_else(|| Error::MissingInput {
                    layer: layer_config.name.clone(),
                    port: port.clone(),
                })?;
                let mut connected = Vec::new();
                let mut covered = HashSet::new();
                for &producer in candidates.iter().rev() {
                    let phase = network.layers[producer].phase();
                    if !covered.insert(phase) {
                        continue;
                    }
                    network.connect(producer, id)?;
                    info!("{} -> {} ({})", network.layers[producer].name, layer_config.name, port);
                    connected.push(producer);
                    if phase.is_none() || covered.len() == 2 {
                        break;
                    }
                }

                for phase in [Phase::Train, Phase::Test] {
                    let runs = network.layers[id].is_included(phase);
                    if runs && !connected.iter().any(|&p| network.layers[p].is_included(phase)) {
                        return Err(Error::config(
                            &layer_config.name,
                            format!("port `{}` has no producer in phase {}", port, phase),
                        ));
                    }
                }
                network.bindings[id].insert(port.clone(), connected);
            }
            for port in &layer_config.outputs {
                producers.entry(port.as_str()).or_default().push(id);
            }
        }

        info!("Network {} initialized with {} layers", network.name, network.layers.len());
        Ok(network)
    }

    /// Append a layer and return its id.
    pub fn add_layer(&mut self, layer: Layer<B>) -> usize {
        let id = self.layers.len();
        self.name_to_ids.entry(layer.name.clone()).or_default().push(id);
        self.layers.push(layer);
        self.adjacent.push(Vec::new());
        self.reverse_adjacent.push(Vec::new());
        self.bindings.push(HashMap::new());
        self.outputs.push(Ports::new());
        self.input_gradients.push(Ports::new());
        id
    }

    /// Add an edge from layer `from` to layer `to`.
    ///
    /// Ports are not checked; a missing input surfaces on the forward pass.
    /// Every port `from` outputs is passed on to `to`.
    pub fn connect(&mut self, from: usize, to: usize) -> Result<()> {
        for id in [from, to] {
            if id >= self.layers.len() {
                return Err(Error::UnknownUnit(id));
            }
        }
        if !self.adjacent[from].contains(&to) {
            self.adjacent[from].push(to);
            self.reverse_adjacent[to].push(from);
        }
        Ok(())
    }

    /// Layer ids in an order where every included predecessor comes first.
    pub fn execution_order(&self, phase: Phase) -> Result<Vec<usize>> {
        let order = self.topological_order(phase, &self.reverse_adjacent, &self.adjacent)?;
        trace!("{} forward order for {}: {:?}", self.name, phase, order);
        Ok(order)
    }

    /// Layer ids in an order where every included successor comes first.
    pub fn reverse_execution_order(&self, phase: Phase) -> Result<Vec<usize>> {
        let order = self.topological_order(phase, &self.adjacent, &self.reverse_adjacent)?;
        trace!("{} backward order for {}: {:?}", self.name, phase, order);
        Ok(order)
    }

    /// Kahn's algorithm over the layers included in `phase`.
    ///
    /// `incoming` decides the in-degree of a layer, `outgoing` which layers
    /// become ready once it is scheduled.
    fn topological_order(&self, phase: Phase, incoming: &[Vec<usize>], outgoing: &[Vec<usize>]) -> Result<Vec<usize>> {
        let included: Vec<bool> = self.layers.iter().map(|l| l.is_included(phase)).collect();
        let mut degree: Vec<usize> = incoming
            .iter()
            .map(|edges| edges.iter().filter(|&&other| included[other]).count())
            .collect();

        let mut ready: VecDeque<usize> = (0..self.layers.len())
            .filter(|&id| included[id] && degree[id] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.layers.len());
        while let Some(id) = ready.pop_front() {
            order.push(id);
            for &next in &outgoing[id] {
                if !included[next] {
                    continue;
                }
                degree[next] -= 1;
                if degree[next] == 0 {
                    ready.push_back(next);
                }
            }
        }

        let pending: Vec<usize> = (0..self.layers.len())
            .filter(|&id| included[id] && degree[id] > 0)
            .collect();
        if !pending.is_empty() {
            return Err(Error::CyclicGraph(pending));
        }
        Ok(order)
    }

    /// Run every layer included in `phase` on the outputs of its predecessors.
    ///
    /// Fails with [DuplicatePort][1] when two predecessors of a layer emit the same port.
    /// [1]: ../error/enum.Error.html#variant.DuplicatePort
    pub fn forward(&mut self, phase: Phase) -> Result<()> {
        for id in self.execution_order(phase)? {
            let mut inputs = Ports::new();
            for &producer in &self.reverse_adjacent[id] {
                if !self.layers[producer].is_included(phase) {
                    continue;
                }
                for (port, tensor) in &self.outputs[producer] {
                    if !self.reads_from(id, port, producer, phase) {
                        continue;
                    }
                    if inputs.insert(port.clone(), tensor.clone()).is_some() {
                        return Err(Error::DuplicatePort {
                            layer: self.layers[id].name.clone(),
                            port: port.clone(),
                        });
                    }
                }
            }

            debug!("{} forward ({})", self.layers[id].name, phase);
            let outputs = self.layers[id].forward(&self.backend, &inputs, phase)?;
            self.outputs[id] = outputs;
        }
        Ok(())
    }

    /// Propagate gradients from the loss layers back to the inputs.
    ///
    /// Expects a [forward](#method.forward) pass in the same phase first.
    pub fn backward(&mut self, phase: Phase) -> Result<()> {
        for id in self.reverse_execution_order(phase)? {
            let mut gradients = Ports::new();
            for &consumer in &self.adjacent[id] {
                if !self.layers[consumer].is_included(phase) {
                    continue;
                }
                for (port, gradient) in &self.input_gradients[consumer] {
                    // the consumer may also report gradients for other producers
                    if !self.layers[id].config.outputs.contains(port) || !self.reads_from(consumer, port, id, phase) {
                        continue;
                    }
                    let summed = match gradients.remove(port) {
                        Some(sum) => self.backend.add(&sum, gradient)?,
                        None => gradient.clone(),
                    };
                    gradients.insert(port.clone(), summed);
                }
            }

            debug!("{} backward ({})", self.layers[id].name, phase);
            let input_gradients = self.layers[id].backward(&self.backend, &gradients, phase)?;
            self.input_gradients[id] = input_gradients;
        }
        Ok(())
    }

    /// Whether `consumer` takes `port` from `producer` in `phase`.
    ///
    /// Ports wired by [from_config](#method.from_config) are read from the
    /// most recent producer that runs in `phase`; any other port is read from
    /// every predecessor.
    fn reads_from(&self, consumer: usize, port: &str, producer: usize, phase: Phase) -> bool {
        match self.bindings[consumer].get(port) {
            Some(candidates) => {
                candidates.iter().find(|&&id| self.layers[id].is_included(phase)) == Some(&producer)
            }
            None => true,
        }
    }

    /// Apply one SGD step to every learnable layer with pending gradients.
    ///
    /// Layers that did not take part in the last backward pass keep their weights.
    pub fn weight_update(&mut self, config: &UpdateConfig) -> Result<()> {
        for layer in self.layers.iter_mut() {
            if !layer.has_gradients() {
                continue;
            }
            debug!("{} update (lr {}, batch {})", layer.name, config.learning_rate, config.batch_size);
            layer.update_weights(&self.backend, config)?;
        }
        Ok(())
    }

    /// Sum of the losses of the loss layers included in `phase`.
    pub fn loss(&self, phase: Phase) -> f32 {
        self.loss_layers()
            .into_iter()
            .filter(|&id| self.layers[id].is_included(phase))
            .filter_map(|id| self.layers[id].worker.loss())
            .sum()
    }

    /// Number of samples the active data layer produced in the last pass.
    pub fn batch_size(&self, phase: Phase) -> Option<usize> {
        let id = self.data_layer(phase)?;
        let port = self.layers[id].config.outputs.last()?;
        self.outputs[id].get(port).map(|t| tensor::batch_size(t.shape()))
    }

    /// The ids of all layers called `name`.
    pub fn layers_by_name(&self, name: &str) -> &[usize] {
        self.name_to_ids.get(name).map(|ids| ids.as_slice()).unwrap_or(&[])
    }

    /// The ids of all loss layers.
    pub fn loss_layers(&self) -> Vec<usize> {
        self.ids_where(|l| l.worker.is_loss())
    }

    /// The ids of all accuracy layers.
    pub fn accuracy_layers(&self) -> Vec<usize> {
        self.ids_where(|l| l.worker.is_accuracy())
    }

    /// The data layer that runs in `phase`.
    pub fn data_layer(&self, phase: Phase) -> Option<usize> {
        self.ids_where(|l| l.worker.is_data() && l.is_included(phase)).into_iter().next()
    }

    /// The ids of all layers with learnable weights.
    pub fn learnable_layer_ids(&self) -> Vec<usize> {
        self.ids_where(|l| l.is_learnable())
    }

    fn ids_where<F: Fn(&Layer<B>) -> bool>(&self, predicate: F) -> Vec<usize> {
        self.layers
            .iter()
            .enumerate()
            .filter(|&(_, layer)| predicate(layer))
            .map(|(id, _)| id)
            .collect()
    }

    /// The layer with the given id.
    pub fn layer(&self, id: usize) -> Result<&Layer<B>> {
        self.layers.get(id).ok_or(Error::UnknownUnit(id))
    }

    /// Mutable access to the layer with the given id.
    pub fn layer_mut(&mut self, id: usize) -> Result<&mut Layer<B>> {
        self.layers.get_mut(id).ok_or(Error::UnknownUnit(id))
    }

    /// All layers, indexed by id.
    pub fn layers(&self) -> &[Layer<B>] {
        &self.layers
    }

    /// The outputs a layer produced in the last forward pass.
    pub fn outputs(&self, id: usize) -> Result<&Ports> {
        self.outputs.get(id).ok_or(Error::UnknownUnit(id))
    }

    /// The input gradients a layer produced in the last backward pass.
    pub fn input_gradients(&self, id: usize) -> Result<&Ports> {
        self.input_gradients.get(id).ok_or(Error::UnknownUnit(id))
    }

    /// Successors of a layer.
    pub fn successors(&self, id: usize) -> Result<&[usize]> {
        self.adjacent.get(id).map(|v| v.as_slice()).ok_or(Error::UnknownUnit(id))
    }

    /// Predecessors of a layer.
    pub fn predecessors(&self, id: usize) -> Result<&[usize]> {
        self.reverse_adjacent.get(id).map(|v| v.as_slice()).ok_or(Error::UnknownUnit(id))
    }

    /// The backend the layers run on.
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: LayerOps> fmt::Display for Network<B> {
    /// Renders the graph in the Graphviz dot language.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "digraph G {{")?;
        for (id, layer) in self.layers.iter().enumerate() {
            writeln!(f, "    n{} [label=\"{}\"];", id, layer.name)?;
        }
        for (from, successors) in self.adjacent.iter().enumerate() {
            for to in successors {
                writeln!(f, "    n{} -> n{};", from, to)?;
            }
        }
        write!(f, "}}")
    }
}

#[derive(Debug, Clone, Default)]
/// Defines the configuration of a Network.
pub struct NetworkConfig {
    /// Name of the network.
    pub name: String,
    /// The layers that make up the net, in assembly order.
    pub layers: Vec<LayerConfig>,
}

impl NetworkConfig {
    /// Create an empty configuration.
    pub fn new(name: &str) -> NetworkConfig {
        NetworkConfig {
            name: name.to_owned(),
            layers: Vec::new(),
        }
    }

    /// Add layer at the end of the network.
    pub fn add_layer(&mut self, layer: LayerConfig) {
        self.layers.push(layer);
    }

    /// The configuration of the layer at `layer_id`.
    pub fn layer(&self, layer_id: usize) -> Option<&LayerConfig> {
        self.layers.get(layer_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerType;
    use crate::util::native_backend;

    fn network(n: usize) -> Network<crate::backend::Native> {
        let mut net = Network::new(native_backend(), "test");
        for i in 0..n {
            let cfg = LayerConfig::new(&format!("l{}", i), LayerType::Linear)
                .add_input("x")
                .add_output("x");
            net.add_layer(Layer::from_config(&cfg).unwrap());
        }
        net
    }

    #[test]
    fn orders_diamond() {
        let mut net = network(4);
        net.connect(0, 1).unwrap();
        net.connect(0, 2).unwrap();
        net.connect(1, 3).unwrap();
        net.connect(2, 3).unwrap();
        assert_eq!(net.execution_order(Phase::Train).unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(net.reverse_execution_order(Phase::Train).unwrap(), vec![3, 1, 2, 0]);
    }

    #[test]
    fn reports_cycle() {
        let mut net = network(3);
        net.connect(0, 1).unwrap();
        net.connect(1, 2).unwrap();
        net.connect(2, 1).unwrap();
        match net.execution_order(Phase::Test) {
            Err(Error::CyclicGraph(ids)) => assert_eq!(ids, vec![1, 2]),
            other => panic!("expected a cycle, got {:?}", other),
        }
    }

    #[test]
    fn unknown_ids() {
        let mut net = network(1);
        assert!(matches!(net.connect(0, 3), Err(Error::UnknownUnit(3))));
        assert!(net.layer(1).is_err());
    }

    #[test]
    fn dot_dump() {
        let mut net = network(2);
        net.connect(0, 1).unwrap();
        assert_eq!(
            net.to_string(),
            "digraph G {\n    n0 [label=\"l0\"];\n    n1 [label=\"l1\"];\n    n0 -> n1;\n}"
        );
    }

    #[test]
    fn name_index() {
        let net = network(2);
        assert_eq!(net.layers_by_name("l1"), &[1]);
        assert!(net.layers_by_name("missing").is_empty());
    }
}
