//! Summation and multiplication of heterogeneous inputs.

use std::cell::Cell;
use std::rc::Rc;

use cadence_ir::{finite, Graph, NodeKey, ParamRef, Target};

use crate::input::{Input, Link};

#[derive(Debug)]
struct SumInner {
    inputs: Vec<Input>,
    node: Cell<Option<NodeKey>>,
}

/// Lazily realised sum of inputs.
#[derive(Clone, Debug)]
pub struct Sum(Rc<SumInner>);

impl Sum {
    /// A lazy sum of `inputs`. Nothing is built until it is realised.
    pub fn new(inputs: Vec<Input>) -> Self {
        Self(Rc::new(SumInner {
            inputs,
            node: Cell::new(None),
        }))
    }

    /// The summed inputs, as given.
    pub fn inputs(&self) -> &[Input] {
        &self.0.inputs
    }

    /// The realised node, if [`to_node`](Self::to_node) has run.
    pub fn node(&self) -> Option<NodeKey> {
        self.0.node.get()
    }

    /// Fold plain numbers into one total; keep the rest in order.
    fn partition(&self, graph: &Graph) -> (f64, Vec<&Input>) {
        let mut total = 0.0;
        let mut dynamics = Vec::new();
        for input in &self.0.inputs {
            match input.constant_value(graph) {
                Some(n) => total += n,
                None => dynamics.push(input),
            }
        }
        (finite(total), dynamics)
    }

    /// Realise as a single node. Repeated calls return the same node.
    pub fn to_node(&self, graph: &mut Graph) -> NodeKey {
        if let Some(node) = self.0.node.get() {
            if graph.contains(node) {
                return node;
            }
        }
        let (total, dynamics) = self.partition(graph);
        let node = match dynamics.as_slice() {
            [] => graph.constant(total),
            [only] if total == 0.0 => only.to_node(graph),
            _ => {
                let sum = graph.gain(1.0);
                for input in &dynamics {
                    let node = input.to_node(graph);
                    graph.connect(node, sum.into());
                }
                if total != 0.0 {
                    let tap = graph.constant(total);
                    graph.connect(tap, sum.into());
                }
                sum
            }
        };
        self.0.node.set(Some(node));
        node
    }

    /// Connect every term straight into `target`, without a summing node.
    pub fn connect(&self, graph: &mut Graph, target: Target) -> Link {
        let (total, dynamics) = self.partition(graph);
        let mut link = Link::default();
        match target {
            Target::Node(_) => {
                for input in &dynamics {
                    link.extend(input.connect(graph, target));
                }
                if total != 0.0 || dynamics.is_empty() {
                    let tap = graph.constant(total);
                    link.push_edge(graph.connect(tap, target));
                }
            }
            Target::Param(param) => {
                let mut bound = false;
                for input in &dynamics {
                    match input {
                        Input::Param(p) if !bound => {
                            bound = true;
                            link.extend(Input::Param(p.clone()).connect(graph, target));
                        }
                        Input::Param(p) => {
                            let node = p.to_node(graph);
                            link.push_edge(graph.connect(node, target));
                        }
                        _ => link.extend(input.connect(graph, target)),
                    }
                }
                fold_total(graph, &mut link, param, total, bound, dynamics.is_empty());
            }
        }
        link
    }
}

/// Land the numeric total on a parameter target.
///
/// Without a bound param the total becomes the parameter's value, unless
/// it is 0 and dynamic inputs exist. With one, a nonzero total needs its
/// own constant tap.
fn fold_total(
    graph: &mut Graph,
    link: &mut Link,
    param: ParamRef,
    total: f64,
    bound: bool,
    no_dynamics: bool,
) {
    if !bound {
        if total != 0.0 || no_dynamics {
            graph.set_param(param, total);
        }
    } else if total != 0.0 {
        let tap = graph.constant(total);
        link.push_edge(graph.connect(tap, param.into()));
    }
}

/// Sum of `inputs`, simplified where no graph work is needed.
///
/// Only literals fold here; constant-source nodes are folded when the
/// sum is realised.
pub fn sum(inputs: Vec<Input>) -> Input {
    let mut total = 0.0;
    let mut rest = Vec::with_capacity(inputs.len());
    for input in inputs {
        match input {
            Input::Number(n) => total += finite(n),
            other => rest.push(other),
        }
    }
    let total = finite(total);
    match rest.len() {
        0 => Input::Number(total),
        1 if total == 0.0 => rest.remove(0),
        _ => {
            if total != 0.0 {
                rest.push(Input::Number(total));
            }
            Input::Sum(Sum::new(rest))
        }
    }
}

/// Product of two inputs.
///
/// Numbers multiply out, 0 annihilates and 1 is the identity. A number
/// times a signal is a gain node; two signals meet in a gain of 0 with
/// `b` driving the gain.
pub fn mul(graph: &mut Graph, a: Input, b: Input) -> Input {
    match (a.constant_value(graph), b.constant_value(graph)) {
        (Some(x), Some(y)) => Input::Number(finite(x * y)),
        (Some(x), _) | (_, Some(x)) if x == 0.0 => Input::Number(0.0),
        (Some(x), None) if x == 1.0 => b,
        (None, Some(y)) if y == 1.0 => a,
        (Some(x), None) => scale(graph, b, x),
        (None, Some(y)) => scale(graph, a, y),
        (None, None) => {
            let gain = graph.gain(0.0);
            a.connect(graph, gain.into());
            b.connect(graph, ParamRef::new(gain, "gain").into());
            Input::Node(gain)
        }
    }
}

fn scale(graph: &mut Graph, input: Input, by: f64) -> Input {
    let gain = graph.gain(by);
    input.connect(graph, gain.into());
    Input::Node(gain)
}
