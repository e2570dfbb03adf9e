//! Automatable scalar components.
//!
//! A [`Param`] owns an automation timeline of its own and mirrors every
//! change onto the graph parameters it is bound to. Binding is how an
//! envelope ends up driving, say, a gain node's `gain` without any extra
//! nodes in between.

use std::cell::RefCell;
use std::rc::Rc;

use cadence_ir::{finite, AudioParam, Automation, Graph, NodeKey, ParamRef};

#[derive(Debug)]
struct ParamState {
    timeline: AudioParam,
    /// Bound targets with the number of binds holding each.
    bindings: Vec<(ParamRef, u32)>,
    node: Option<NodeKey>,
}

/// Shared handle to an automatable scalar.
#[derive(Clone, Debug)]
pub struct Param(Rc<RefCell<ParamState>>);

impl Param {
    /// A param at `value` with an empty timeline.
    pub fn new(value: f64) -> Self {
        Self(Rc::new(RefCell::new(ParamState {
            timeline: AudioParam::new("value", finite(value)),
            bindings: Vec::new(),
            node: None,
        })))
    }

    /// Intrinsic value, ignoring automation.
    pub fn value(&self) -> f64 {
        self.0.borrow().timeline.value()
    }

    /// Value of the timeline at `t`.
    pub fn value_at(&self, t: f64) -> f64 {
        self.0.borrow().timeline.value_at(t)
    }

    /// Scheduled automation, in time order.
    pub fn events(&self) -> Vec<Automation> {
        self.0.borrow().timeline.events().to_vec()
    }

    /// Graph parameters currently mirroring this one.
    pub fn bindings(&self) -> Vec<ParamRef> {
        self.0.borrow().bindings.iter().map(|(p, _)| *p).collect()
    }

    /// The memoised node form, if it has been built.
    pub fn node(&self) -> Option<NodeKey> {
        self.0.borrow().node
    }

    pub fn ptr_eq(&self, other: &Param) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn apply(&self, graph: &mut Graph, f: impl Fn(&mut AudioParam)) {
        let mut state = self.0.borrow_mut();
        f(&mut state.timeline);
        for (binding, _) in &state.bindings {
            if let Some(target) = graph.param_mut(*binding) {
                f(target);
            }
        }
    }

    /// Set the intrinsic value here and on every binding.
    pub fn set_value(&self, graph: &mut Graph, value: f64) {
        self.apply(graph, |p| p.set_value(value));
    }

    /// Jump to `value` at `time`.
    pub fn set_at(&self, graph: &mut Graph, value: f64, time: f64) {
        self.apply(graph, |p| p.set_value_at(value, time));
    }

    /// Approach `target` exponentially from `time` with `time_constant`.
    pub fn target_at(&self, graph: &mut Graph, target: f64, time: f64, time_constant: f64) {
        self.apply(graph, |p| p.set_target_at(target, time, time_constant));
    }

    /// Ramp linearly to `value`, reaching it at `time`.
    pub fn linear_at(&self, graph: &mut Graph, value: f64, time: f64) {
        self.apply(graph, |p| p.linear_ramp_to(value, time));
    }

    /// Ramp exponentially to `value`, reaching it at `time`.
    pub fn exponential_at(&self, graph: &mut Graph, value: f64, time: f64) {
        self.apply(graph, |p| p.exponential_ramp_to(value, time));
    }

    /// Drop automation at or after `time`.
    pub fn cancel(&self, graph: &mut Graph, time: f64) {
        self.apply(graph, |p| p.cancel_from(time));
    }

    /// Mirror this param onto `target`.
    ///
    /// The target takes the intrinsic value and every scheduled event.
    /// Binding an already bound target only adds a hold on it.
    /// Returns `false` if the target does not exist.
    pub fn bind(&self, graph: &mut Graph, target: ParamRef) -> bool {
        let mut state = self.0.borrow_mut();
        let Some(p) = graph.param_mut(target) else {
            return false;
        };
        if let Some((_, holds)) = state.bindings.iter_mut().find(|(b, _)| *b == target) {
            *holds += 1;
            return true;
        }
        p.set_value(state.timeline.value());
        for event in state.timeline.events() {
            p.schedule(*event);
        }
        state.bindings.push((target, 1));
        true
    }

    /// Release one hold on `target`; mirroring stops when none are left.
    /// Its current timeline is left as is.
    pub fn unbind(&self, target: ParamRef) {
        let mut state = self.0.borrow_mut();
        if let Some(pos) = state.bindings.iter().position(|(b, _)| *b == target) {
            let holds = &mut state.bindings[pos].1;
            *holds = holds.saturating_sub(1);
            if *holds == 0 {
                state.bindings.remove(pos);
            }
        }
    }

    /// Stop mirroring onto every target.
    pub fn unbind_all(&self) {
        self.0.borrow_mut().bindings.clear();
    }

    /// Node form: a gain carrying this param, fed by a unit constant.
    ///
    /// Built once and reused.
    pub fn to_node(&self, graph: &mut Graph) -> NodeKey {
        if let Some(node) = self.node() {
            if graph.contains(node) {
                return node;
            }
        }
        let gain = graph.gain(0.0);
        let one = graph.constant(1.0);
        graph.connect(one, gain.into());
        self.bind(graph, ParamRef::new(gain, "gain"));
        self.0.borrow_mut().node = Some(gain);
        gain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn automation_is_mirrored_to_bindings() {
        let mut graph = Graph::new();
        let g = graph.gain(1.0);
        let gain = ParamRef::new(g, "gain");
        let param = Param::new(0.5);

        assert!(param.bind(&mut graph, gain));
        assert_eq!(graph.param(gain).unwrap().value(), 0.5);

        param.linear_at(&mut graph, 1.0, 2.0);
        assert_eq!(graph.param(gain).unwrap().value_at(1.0), 0.75);
        assert_eq!(param.value_at(1.0), 0.75);
    }

    #[test]
    fn bind_replays_existing_events() {
        let mut graph = Graph::new();
        let g = graph.gain(1.0);
        let param = Param::new(0.0);
        param.set_at(&mut graph, 3.0, 1.0);

        param.bind(&mut graph, ParamRef::new(g, "gain"));
        assert_eq!(graph.param(ParamRef::new(g, "gain")).unwrap().value_at(1.0), 3.0);
    }

    #[test]
    fn unbind_stops_mirroring() {
        let mut graph = Graph::new();
        let g = graph.gain(1.0);
        let gain = ParamRef::new(g, "gain");
        let param = Param::new(0.0);
        param.bind(&mut graph, gain);
        param.unbind(gain);
        param.set_at(&mut graph, 9.0, 0.0);
        assert!(graph.param(gain).unwrap().events().is_empty());
    }

    #[test]
    fn rebinding_adds_a_hold_without_copying_events_again() {
        let mut graph = Graph::new();
        let g = graph.gain(1.0);
        let gain = ParamRef::new(g, "gain");
        let param = Param::new(0.0);
        param.set_at(&mut graph, 1.0, 0.5);
        assert!(param.bind(&mut graph, gain));
        assert!(param.bind(&mut graph, gain));
        assert_eq!(graph.param(gain).unwrap().events().len(), 1);

        param.unbind(gain);
        assert_eq!(param.bindings(), vec![gain]);
        param.unbind(gain);
        assert!(param.bindings().is_empty());
    }

    #[test]
    fn bind_to_missing_param_fails() {
        let mut graph = Graph::new();
        let g = graph.gain(1.0);
        let param = Param::new(0.0);
        assert!(!param.bind(&mut graph, ParamRef::new(g, "frequency")));
        assert!(param.bindings().is_empty());
    }

    #[test]
    fn node_form_is_gain_times_one() {
        let mut graph = Graph::new();
        let param = Param::new(440.0);
        let node = param.to_node(&mut graph);
        assert_eq!(param.to_node(&mut graph), node);
        assert_eq!(
            graph.describe(node),
            json!({
                "name": "GainNode",
                "gain": { "value": 440.0, "inputs": [] },
                "inputs": [{
                    "name": "ConstantSourceNode",
                    "offset": { "value": 1.0, "inputs": [] },
                    "inputs": []
                }]
            })
        );
    }
}
