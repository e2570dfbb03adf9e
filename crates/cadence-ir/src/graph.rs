//! Node arena standing in for the host audio graph.
//!
//! Nodes live in a slot map so they keep identity for their whole life;
//! edges are stored in connection order. Feedback through buses makes
//! cycles legal, so every traversal tracks the nodes it is inside of.

use arrayvec::ArrayVec;
use serde_json::{json, Map, Value};
use slotmap::{new_key_type, SlotMap};

use crate::automation::AudioParam;
use crate::buffer::Buffer;
use crate::numeric::finite;

new_key_type! {
    /// Identity of a node in the graph arena.
    pub struct NodeKey;
}

/// Maximum automatable parameters per node.
pub const MAX_PARAMS: usize = 6;

/// Identity of a single connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(u64);

/// A named parameter on a specific node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ParamRef {
    pub node: NodeKey,
    pub name: &'static str,
}

impl ParamRef {
    /// Parameter `name` on `node`.
    pub fn new(node: NodeKey, name: &'static str) -> Self {
        Self { node, name }
    }
}

/// Where a connection lands: a node's signal input or one of its parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Target {
    Node(NodeKey),
    Param(ParamRef),
}

impl Target {
    /// The node that owns this connection point.
    pub fn node(&self) -> NodeKey {
        match *self {
            Target::Node(node) => node,
            Target::Param(param) => param.node,
        }
    }
}

impl From<NodeKey> for Target {
    fn from(node: NodeKey) -> Self {
        Target::Node(node)
    }
}

impl From<ParamRef> for Target {
    fn from(param: ParamRef) -> Self {
        Target::Param(param)
    }
}

/// Oscillator waveform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    /// Waveform name as it appears in descriptions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Triangle => "triangle",
        }
    }

    /// Parse a waveform name, accepting the short forms used by ugen names.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sine" | "sin" => Some(Waveform::Sine),
            "square" => Some(Waveform::Square),
            "sawtooth" | "saw" => Some(Waveform::Sawtooth),
            "triangle" | "tri" => Some(Waveform::Triangle),
            _ => None,
        }
    }
}

/// The primitive node types the host engine supplies.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Destination,
    Analyser,
    Gain,
    Constant,
    Oscillator {
        waveform: Waveform,
    },
    BufferSource {
        buffer: Option<Buffer>,
        looping: bool,
        loop_start: f64,
        loop_end: f64,
    },
    Compressor,
}

impl NodeKind {
    /// Host-facing type name, used in graph descriptions.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Destination => "AudioDestinationNode",
            NodeKind::Analyser => "AnalyserNode",
            NodeKind::Gain => "GainNode",
            NodeKind::Constant => "ConstantSourceNode",
            NodeKind::Oscillator { .. } => "OscillatorNode",
            NodeKind::BufferSource { .. } => "AudioBufferSourceNode",
            NodeKind::Compressor => "DynamicsCompressorNode",
        }
    }

    /// Parameters this kind exposes, with their defaults, in host order.
    pub fn default_params(&self) -> &'static [(&'static str, f64)] {
        match self {
            NodeKind::Destination | NodeKind::Analyser => &[],
            NodeKind::Gain => &[("gain", 1.0)],
            NodeKind::Constant => &[("offset", 1.0)],
            NodeKind::Oscillator { .. } => &[("frequency", 440.0), ("detune", 0.0)],
            NodeKind::BufferSource { .. } => &[("playbackRate", 1.0)],
            NodeKind::Compressor => &[
                ("threshold", -24.0),
                ("knee", 30.0),
                ("ratio", 12.0),
                ("reduction", 0.0),
                ("attack", 0.003),
                ("release", 0.25),
            ],
        }
    }

    /// Source nodes can be started and stopped.
    pub fn is_source(&self) -> bool {
        matches!(
            self,
            NodeKind::Constant | NodeKind::Oscillator { .. } | NodeKind::BufferSource { .. }
        )
    }
}

/// Arguments of a source node's start call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StartCall {
    pub time: f64,
    pub offset: Option<f64>,
    pub duration: Option<f64>,
}

impl StartCall {
    /// Start at `time` with no offset or duration.
    pub fn at(time: f64) -> Self {
        Self {
            time: finite(time),
            offset: None,
            duration: None,
        }
    }
}

/// Where a source node is in its one-shot lifecycle at a given time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Init,
    Started,
    Stopped,
}

/// A node in the arena.
#[derive(Clone, Debug)]
pub struct Node {
    kind: NodeKind,
    params: ArrayVec<AudioParam, MAX_PARAMS>,
    started: Option<StartCall>,
    stopped: Option<f64>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        let params = kind
            .default_params()
            .iter()
            .map(|&(name, default)| AudioParam::new(name, default))
            .collect();
        Self {
            kind,
            params,
            started: None,
            stopped: None,
        }
    }

    /// What this node is.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn params(&self) -> &[AudioParam] {
        &self.params
    }

    /// Parameter `name`, if this kind has it.
    pub fn param(&self, name: &str) -> Option<&AudioParam> {
        self.params.iter().find(|p| p.name() == name)
    }

    pub fn param_mut(&mut self, name: &str) -> Option<&mut AudioParam> {
        self.params.iter_mut().find(|p| p.name() == name)
    }

    /// The recorded start call, if started.
    pub fn start_call(&self) -> Option<StartCall> {
        self.started
    }

    /// The recorded stop time, if stopped.
    pub fn stop_time(&self) -> Option<f64> {
        self.stopped
    }
}

/// A connection from a node's output to a target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    pub from: NodeKey,
    pub to: Target,
    /// Number of `connect` calls still holding this edge.
    pub holders: u32,
}

/// The node arena plus its connections.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    nodes: SlotMap<NodeKey, Node>,
    edges: Vec<Edge>,
    next_edge: u64,
}

impl Graph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node of the given kind with default parameters.
    pub fn create(&mut self, kind: NodeKind) -> NodeKey {
        self.nodes.insert(Node::new(kind))
    }

    /// Create a gain node with the given gain.
    pub fn gain(&mut self, gain: f64) -> NodeKey {
        let key = self.create(NodeKind::Gain);
        self.set_param(ParamRef::new(key, "gain"), gain);
        key
    }

    /// Create a constant source holding `value`.
    pub fn constant(&mut self, value: f64) -> NodeKey {
        let key = self.create(NodeKind::Constant);
        self.set_param(ParamRef::new(key, "offset"), value);
        key
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `key` is a live node.
    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Node `key`, if live.
    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub fn kind(&self, key: NodeKey) -> Option<&NodeKind> {
        self.nodes.get(key).map(Node::kind)
    }

    pub fn kind_mut(&mut self, key: NodeKey) -> Option<&mut NodeKind> {
        self.nodes.get_mut(key).map(|n| &mut n.kind)
    }

    /// A parameter by reference.
    pub fn param(&self, param: ParamRef) -> Option<&AudioParam> {
        self.nodes.get(param.node)?.param(param.name)
    }

    /// A parameter by reference, mutably.
    pub fn param_mut(&mut self, param: ParamRef) -> Option<&mut AudioParam> {
        self.nodes.get_mut(param.node)?.param_mut(param.name)
    }

    /// Set a parameter's intrinsic value. Unknown parameters are ignored.
    pub fn set_param(&mut self, param: ParamRef, value: f64) {
        if let Some(p) = self.param_mut(param) {
            p.set_value(value);
        }
    }

    /// The value a node contributes if it is a plain constant source.
    ///
    /// Only an un-automated, un-modulated constant source counts.
    pub fn constant_value(&self, key: NodeKey) -> Option<f64> {
        let node = self.nodes.get(key)?;
        if node.kind != NodeKind::Constant {
            return None;
        }
        let offset = node.param("offset")?;
        let target = Target::Param(ParamRef::new(key, "offset"));
        if !offset.events().is_empty() || self.edges.iter().any(|e| e.to == target) {
            return None;
        }
        Some(offset.value())
    }

    /// Connect `from` to `to`. Returns `None` if either end does not exist.
    ///
    /// Connecting the same pair twice yields the existing edge, which then
    /// needs one [`disconnect_edge`](Self::disconnect_edge) per connect.
    pub fn connect(&mut self, from: NodeKey, to: Target) -> Option<EdgeId> {
        if !self.nodes.contains_key(from) {
            return None;
        }
        let valid = match to {
            Target::Node(node) => self.nodes.contains_key(node),
            Target::Param(param) => self.param(param).is_some(),
        };
        if !valid {
            return None;
        }
        if let Some(edge) = self.edges.iter_mut().find(|e| e.from == from && e.to == to) {
            edge.holders += 1;
            return Some(edge.id);
        }
        self.next_edge += 1;
        let id = EdgeId(self.next_edge);
        self.edges.push(Edge {
            id,
            from,
            to,
            holders: 1,
        });
        Some(id)
    }

    /// Release one hold on an edge, removing it once nothing holds it.
    /// Returns whether it existed.
    pub fn disconnect_edge(&mut self, id: EdgeId) -> bool {
        let Some(pos) = self.edges.iter().position(|e| e.id == id) else {
            return false;
        };
        let edge = &mut self.edges[pos];
        edge.holders = edge.holders.saturating_sub(1);
        if edge.holders == 0 {
            self.edges.remove(pos);
        }
        true
    }

    /// Remove every outgoing edge of `from`. Returns how many were removed.
    pub fn disconnect(&mut self, from: NodeKey) -> usize {
        let before = self.edges.len();
        self.edges.retain(|e| e.from != from);
        before - self.edges.len()
    }

    /// Every edge, in connection order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Nodes feeding `target`, in connection order.
    pub fn inputs(&self, target: Target) -> impl Iterator<Item = NodeKey> + '_ {
        self.edges
            .iter()
            .filter(move |e| e.to == target)
            .map(|e| e.from)
    }

    /// Record a start call on a source node. Only the first call counts.
    pub fn start(&mut self, key: NodeKey, call: StartCall) -> bool {
        match self.nodes.get_mut(key) {
            Some(node) if node.kind.is_source() && node.started.is_none() => {
                node.started = Some(call);
                true
            }
            _ => false,
        }
    }

    /// Record a stop on a started source node. Only the first call counts.
    pub fn stop(&mut self, key: NodeKey, time: f64) -> bool {
        match self.nodes.get_mut(key) {
            Some(node) if node.started.is_some() && node.stopped.is_none() => {
                node.stopped = Some(finite(time));
                true
            }
            _ => false,
        }
    }

    /// Lifecycle state of a source node at time `t`.
    pub fn playback_state(&self, key: NodeKey, t: f64) -> PlaybackState {
        let Some(node) = self.nodes.get(key) else {
            return PlaybackState::Init;
        };
        match (node.started, node.stopped) {
            (Some(_), Some(stop)) if stop <= t => PlaybackState::Stopped,
            (Some(start), _) if start.time <= t => PlaybackState::Started,
            _ => PlaybackState::Init,
        }
    }

    /// Render `key` and everything feeding it as a JSON tree.
    ///
    /// A node reached again while still inside its own description is
    /// printed as `"<circular:Name>"`.
    pub fn describe(&self, key: NodeKey) -> Value {
        let mut path = Vec::new();
        self.describe_node(key, &mut path)
    }

    fn describe_node(&self, key: NodeKey, path: &mut Vec<NodeKey>) -> Value {
        let Some(node) = self.nodes.get(key) else {
            return Value::Null;
        };
        if path.contains(&key) {
            return Value::String(format!("<circular:{}>", node.kind.name()));
        }
        path.push(key);

        let mut out = Map::new();
        out.insert("name".into(), json!(node.kind.name()));
        match &node.kind {
            NodeKind::Oscillator { waveform } => {
                out.insert("type".into(), json!(waveform.as_str()));
            }
            NodeKind::BufferSource {
                buffer,
                looping,
                loop_start,
                loop_end,
            } => {
                let buffer = buffer.as_ref().map_or(Value::Null, |b| {
                    json!({
                        "name": "AudioBuffer",
                        "length": b.len(),
                        "duration": b.duration(),
                        "sampleRate": b.sample_rate(),
                        "numberOfChannels": b.channels(),
                    })
                });
                out.insert("buffer".into(), buffer);
                out.insert("loop".into(), json!(looping));
                out.insert("loopStart".into(), json!(loop_start));
                out.insert("loopEnd".into(), json!(loop_end));
            }
            _ => {}
        }
        for param in &node.params {
            let target = Target::Param(ParamRef::new(key, param.name()));
            let inputs: Vec<Value> = self
                .inputs(target)
                .map(|from| self.describe_node(from, path))
                .collect();
            out.insert(
                param.name().into(),
                json!({ "value": param.value(), "inputs": inputs }),
            );
        }
        let inputs: Vec<Value> = self
            .inputs(Target::Node(key))
            .map(|from| self.describe_node(from, path))
            .collect();
        out.insert("inputs".into(), Value::Array(inputs));

        path.pop();
        Value::Object(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_uses_kind_defaults() {
        let mut graph = Graph::new();
        let osc = graph.create(NodeKind::Oscillator {
            waveform: Waveform::Sine,
        });
        assert_eq!(graph.param(ParamRef::new(osc, "frequency")).unwrap().value(), 440.0);
        assert_eq!(graph.param(ParamRef::new(osc, "detune")).unwrap().value(), 0.0);
        assert!(graph.param(ParamRef::new(osc, "gain")).is_none());
    }

    #[test]
    fn connect_collapses_duplicates() {
        let mut graph = Graph::new();
        let a = graph.gain(1.0);
        let b = graph.gain(1.0);
        let e1 = graph.connect(a, b.into()).unwrap();
        let e2 = graph.connect(a, b.into()).unwrap();
        assert_eq!(e1, e2);
        assert_eq!(graph.edges().len(), 1);
        assert_eq!(graph.edges()[0].holders, 2);
    }

    #[test]
    fn shared_edge_survives_until_every_holder_lets_go() {
        let mut graph = Graph::new();
        let a = graph.gain(1.0);
        let b = graph.gain(1.0);
        let edge = graph.connect(a, b.into()).unwrap();
        graph.connect(a, b.into());

        assert!(graph.disconnect_edge(edge));
        assert_eq!(graph.inputs(b.into()).collect::<Vec<_>>(), vec![a]);
        assert!(graph.disconnect_edge(edge));
        assert_eq!(graph.inputs(b.into()).count(), 0);
        assert!(!graph.disconnect_edge(edge));
    }

    #[test]
    fn connect_rejects_missing_param() {
        let mut graph = Graph::new();
        let a = graph.gain(1.0);
        let b = graph.gain(1.0);
        assert!(graph.connect(a, ParamRef::new(b, "frequency").into()).is_none());
    }

    #[test]
    fn disconnect_only_touches_outgoing_edges() {
        let mut graph = Graph::new();
        let a = graph.gain(1.0);
        let b = graph.gain(1.0);
        let c = graph.gain(1.0);
        graph.connect(a, c.into());
        graph.connect(b, c.into());
        assert_eq!(graph.disconnect(a), 1);
        assert_eq!(graph.inputs(c.into()).collect::<Vec<_>>(), vec![b]);
    }

    #[test]
    fn inputs_keep_connection_order() {
        let mut graph = Graph::new();
        let sink = graph.gain(1.0);
        let srcs: Vec<NodeKey> = (0..4).map(|_| graph.constant(0.0)).collect();
        for &s in srcs.iter().rev() {
            graph.connect(s, sink.into());
        }
        let mut expected = srcs.clone();
        expected.reverse();
        assert_eq!(graph.inputs(sink.into()).collect::<Vec<_>>(), expected);
    }

    #[test]
    fn constant_value_only_for_plain_constants() {
        let mut graph = Graph::new();
        let dc = graph.constant(3.0);
        assert_eq!(graph.constant_value(dc), Some(3.0));

        let g = graph.gain(3.0);
        assert_eq!(graph.constant_value(g), None);

        let modulated = graph.constant(1.0);
        graph.connect(dc, ParamRef::new(modulated, "offset").into());
        assert_eq!(graph.constant_value(modulated), None);
    }

    #[test]
    fn playback_state_follows_start_and_stop() {
        let mut graph = Graph::new();
        let osc = graph.create(NodeKind::Oscillator {
            waveform: Waveform::Sine,
        });
        assert!(graph.start(osc, StartCall::at(0.1)));
        assert!(!graph.start(osc, StartCall::at(0.5)));
        assert!(graph.stop(osc, 0.2));

        assert_eq!(graph.playback_state(osc, 0.05), PlaybackState::Init);
        assert_eq!(graph.playback_state(osc, 0.1), PlaybackState::Started);
        assert_eq!(graph.playback_state(osc, 0.2), PlaybackState::Stopped);
    }

    #[test]
    fn gain_nodes_cannot_be_started() {
        let mut graph = Graph::new();
        let g = graph.gain(1.0);
        assert!(!graph.start(g, StartCall::at(0.0)));
        assert!(!graph.stop(g, 1.0));
    }

    #[test]
    fn describe_renders_params_and_inputs() {
        let mut graph = Graph::new();
        let osc = graph.create(NodeKind::Oscillator {
            waveform: Waveform::Sine,
        });
        let out = graph.gain(0.5);
        graph.connect(osc, out.into());

        assert_eq!(
            graph.describe(out),
            json!({
                "name": "GainNode",
                "gain": { "value": 0.5, "inputs": [] },
                "inputs": [{
                    "name": "OscillatorNode",
                    "type": "sine",
                    "frequency": { "value": 440.0, "inputs": [] },
                    "detune": { "value": 0.0, "inputs": [] },
                    "inputs": []
                }]
            })
        );
    }

    #[test]
    fn describe_marks_cycles() {
        let mut graph = Graph::new();
        let a = graph.gain(1.0);
        let b = graph.gain(1.0);
        graph.connect(a, b.into());
        graph.connect(b, ParamRef::new(a, "gain").into());

        assert_eq!(
            graph.describe(b),
            json!({
                "name": "GainNode",
                "gain": { "value": 1.0, "inputs": [] },
                "inputs": [{
                    "name": "GainNode",
                    "gain": { "value": 1.0, "inputs": ["<circular:GainNode>"] },
                    "inputs": []
                }]
            })
        );
    }

    #[test]
    fn shared_inputs_are_not_cycles() {
        let mut graph = Graph::new();
        let dc = graph.constant(1.0);
        let a = graph.gain(1.0);
        let b = graph.gain(1.0);
        let sink = graph.gain(1.0);
        graph.connect(dc, a.into());
        graph.connect(dc, b.into());
        graph.connect(a, sink.into());
        graph.connect(b, sink.into());

        let text = graph.describe(sink).to_string();
        assert!(!text.contains("circular"));
    }
}
