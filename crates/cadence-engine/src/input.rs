//! Anything that can feed a node or a parameter.

use cadence_ir::{finite, EdgeId, Graph, NodeKey, ParamRef, Target};

use crate::param::Param;
use crate::sum::Sum;

/// A connectable value.
///
/// Literal numbers and constant-source nodes count as plain numbers during
/// summation; everything else is dynamic.
#[derive(Clone, Debug)]
pub enum Input {
    Number(f64),
    Node(NodeKey),
    Param(Param),
    Sum(Sum),
}

impl Default for Input {
    fn default() -> Self {
        Input::Number(0.0)
    }
}

impl From<f64> for Input {
    fn from(n: f64) -> Self {
        Input::Number(n)
    }
}

impl From<NodeKey> for Input {
    fn from(node: NodeKey) -> Self {
        Input::Node(node)
    }
}

impl From<Param> for Input {
    fn from(param: Param) -> Self {
        Input::Param(param)
    }
}

impl From<Sum> for Input {
    fn from(sum: Sum) -> Self {
        Input::Sum(sum)
    }
}

impl Input {
    /// The scalar this input stands for, if it is a plain number.
    pub fn constant_value(&self, graph: &Graph) -> Option<f64> {
        match self {
            Input::Number(n) => Some(finite(*n)),
            Input::Node(node) => graph.constant_value(*node),
            Input::Param(_) | Input::Sum(_) => None,
        }
    }

    /// Whether this is a plain number.
    pub fn is_number(&self) -> bool {
        matches!(self, Input::Number(_))
    }

    /// Realise this input as a single node.
    pub fn to_node(&self, graph: &mut Graph) -> NodeKey {
        match self {
            Input::Number(n) => graph.constant(finite(*n)),
            Input::Node(node) => *node,
            Input::Param(param) => param.to_node(graph),
            Input::Sum(sum) => sum.to_node(graph),
        }
    }

    /// Connect into `target`, returning what was established.
    ///
    /// A number landing on a parameter just sets it; a param landing on a
    /// parameter binds to it.
    pub fn connect(&self, graph: &mut Graph, target: Target) -> Link {
        let mut link = Link::default();
        match (self, target) {
            (Input::Number(n), Target::Param(p)) => graph.set_param(p, finite(*n)),
            (Input::Param(param), Target::Param(p)) => {
                if param.bind(graph, p) {
                    link.bindings.push((param.clone(), p));
                }
            }
            (Input::Sum(sum), _) => return sum.connect(graph, target),
            _ => {
                let node = self.to_node(graph);
                link.push_edge(graph.connect(node, target));
            }
        }
        link
    }

    /// Remove every outgoing connection of this input's realised form.
    pub fn disconnect(&self, graph: &mut Graph) {
        match self {
            Input::Number(_) => {}
            Input::Node(node) => {
                graph.disconnect(*node);
            }
            Input::Param(param) => {
                param.unbind_all();
                if let Some(node) = param.node() {
                    graph.disconnect(node);
                }
            }
            Input::Sum(sum) => {
                if let Some(node) = sum.node() {
                    graph.disconnect(node);
                }
            }
        }
    }
}

/// The edges and bindings established by one connect call.
///
/// Disconnecting a link removes exactly those, never the target's other
/// inputs. An edge shared with another link stays until both let go.
#[derive(Clone, Debug, Default)]
pub struct Link {
    edges: Vec<EdgeId>,
    bindings: Vec<(Param, ParamRef)>,
}

impl Link {
    /// Graph edges this link holds.
    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }

    /// Parameters this link bound a [`Param`] to.
    pub fn bound(&self) -> impl Iterator<Item = ParamRef> + '_ {
        self.bindings.iter().map(|(_, p)| *p)
    }

    /// Whether the connect established nothing, e.g. a number set on a param.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty() && self.bindings.is_empty()
    }

    pub(crate) fn push_edge(&mut self, edge: Option<EdgeId>) {
        if let Some(edge) = edge {
            self.edges.push(edge);
        }
    }

    pub(crate) fn extend(&mut self, other: Link) {
        self.edges.extend(other.edges);
        self.bindings.extend(other.bindings);
    }

    /// Release every edge and binding this link holds.
    pub fn disconnect(self, graph: &mut Graph) {
        for edge in self.edges {
            graph.disconnect_edge(edge);
        }
        for (param, target) in self.bindings {
            param.unbind(target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_ir::{NodeKind, Waveform};

    #[test]
    fn number_into_param_sets_value() {
        let mut graph = Graph::new();
        let g = graph.gain(1.0);
        let link = Input::Number(0.25).connect(&mut graph, ParamRef::new(g, "gain").into());
        assert!(link.is_empty());
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.param(ParamRef::new(g, "gain")).unwrap().value(), 0.25);
    }

    #[test]
    fn number_into_node_creates_constant() {
        let mut graph = Graph::new();
        let g = graph.gain(1.0);
        let link = Input::Number(2.0).connect(&mut graph, g.into());
        assert_eq!(link.edges().len(), 1);
        let src = graph.inputs(g.into()).next().unwrap();
        assert_eq!(graph.constant_value(src), Some(2.0));
    }

    #[test]
    fn link_disconnect_leaves_other_inputs() {
        let mut graph = Graph::new();
        let sink = graph.gain(1.0);
        let a = graph.create(NodeKind::Oscillator {
            waveform: Waveform::Sine,
        });
        let b = graph.create(NodeKind::Oscillator {
            waveform: Waveform::Square,
        });
        let _keep = Input::Node(a).connect(&mut graph, sink.into());
        let drop = Input::Node(b).connect(&mut graph, sink.into());
        drop.disconnect(&mut graph);
        assert_eq!(graph.inputs(sink.into()).collect::<Vec<_>>(), vec![a]);
    }

    #[test]
    fn links_sharing_an_edge_each_hold_it() {
        let mut graph = Graph::new();
        let sink = graph.gain(1.0);
        let osc = graph.create(NodeKind::Oscillator {
            waveform: Waveform::Sine,
        });
        let first = Input::Node(osc).connect(&mut graph, sink.into());
        let second = Input::Node(osc).connect(&mut graph, sink.into());
        assert_eq!(first.edges(), second.edges());

        first.disconnect(&mut graph);
        assert_eq!(graph.inputs(sink.into()).collect::<Vec<_>>(), vec![osc]);
        second.disconnect(&mut graph);
        assert_eq!(graph.inputs(sink.into()).count(), 0);
    }

    #[test]
    fn param_link_unbinds_on_disconnect() {
        let mut graph = Graph::new();
        let g = graph.gain(1.0);
        let gain = ParamRef::new(g, "gain");
        let param = Param::new(0.3);
        let link = Input::Param(param.clone()).connect(&mut graph, gain.into());
        assert_eq!(link.bound().collect::<Vec<_>>(), vec![gain]);
        link.disconnect(&mut graph);
        assert!(param.bindings().is_empty());
    }

    #[test]
    fn constant_nodes_count_as_numbers() {
        let mut graph = Graph::new();
        let dc = graph.constant(3.0);
        let g = graph.gain(3.0);
        assert_eq!(Input::Node(dc).constant_value(&graph), Some(3.0));
        assert_eq!(Input::Node(g).constant_value(&graph), None);
        assert_eq!(Input::Number(f64::NAN).constant_value(&graph), Some(0.0));
    }
}
