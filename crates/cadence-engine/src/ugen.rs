//! Unit generator handles and keys.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use cadence_ir::{Graph, NodeKey};

use crate::context::Context;
use crate::emitter::{Emitter, Listener, UGenEvent};
use crate::error::EngineError;
use crate::input::Input;

/// A ugen key: `name[#id][.class…]`, e.g. `"adsr#amp.env"`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct UGenKey {
    pub name: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
}

impl UGenKey {
    /// A key with only a name.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

impl FromStr for UGenKey {
    type Err = EngineError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| EngineError::InvalidKey {
            key: key.to_string(),
            reason,
        };
        let name_end = key.find(['#', '.']).unwrap_or(key.len());
        let name = &key[..name_end];
        if name.is_empty() {
            return Err(invalid("missing name"));
        }

        let mut parsed = UGenKey::named(name);
        let mut rest = &key[name_end..];
        while let Some(marker) = rest.chars().next() {
            let body = &rest[1..];
            let end = body.find(['#', '.']).unwrap_or(body.len());
            let part = &body[..end];
            if part.is_empty() {
                return Err(invalid("empty id or class"));
            }
            if marker == '#' {
                if parsed.id.is_some() {
                    return Err(invalid("more than one id"));
                }
                parsed.id = Some(part.to_string());
            } else {
                parsed.classes.push(part.to_string());
            }
            rest = &body[end..];
        }
        Ok(parsed)
    }
}

impl fmt::Display for UGenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(id) = &self.id {
            write!(f, "#{id}")?;
        }
        for class in &self.classes {
            write!(f, ".{class}")?;
        }
        Ok(())
    }
}

/// Nodes that belong to one synth rather than to the context.
#[derive(Debug, Default)]
pub struct SynthScope {
    local_buses: BTreeMap<usize, NodeKey>,
    outputs: BTreeMap<i64, NodeKey>,
    sinks: Vec<NodeKey>,
}

impl SynthScope {
    /// Synth-local bus `index`, created on first use.
    pub fn local_bus(&mut self, graph: &mut Graph, index: usize) -> NodeKey {
        *self
            .local_buses
            .entry(index)
            .or_insert_with(|| graph.gain(1.0))
    }

    /// Register `node` as output `index`. A second node on the same index
    /// is summed with the first.
    pub fn set_output(&mut self, graph: &mut Graph, index: i64, node: NodeKey) {
        let node = match self.outputs.get(&index) {
            Some(&existing) if existing != node => {
                crate::sum::Sum::new(vec![existing.into(), node.into()]).to_node(graph)
            }
            _ => node,
        };
        self.outputs.insert(index, node);
        self.mark_sink(node);
    }

    /// Make `node` output `index`, dropping whatever was there.
    pub fn replace_output(&mut self, index: i64, node: NodeKey) {
        self.outputs.insert(index, node);
    }

    /// Mark a node as already routed, so it is not taken as output 0.
    pub fn mark_sink(&mut self, node: NodeKey) {
        if !self.sinks.contains(&node) {
            self.sinks.push(node);
        }
    }

    /// Whether `node` is already routed somewhere.
    pub fn is_sink(&self, node: NodeKey) -> bool {
        self.sinks.contains(&node)
    }

    pub fn has_sinks(&self) -> bool {
        !self.sinks.is_empty()
    }

    /// Output nodes by audio bus index.
    pub fn outputs(&self) -> &BTreeMap<i64, NodeKey> {
        &self.outputs
    }
}

struct UGenInner {
    key: UGenKey,
    index: usize,
    outlet: RefCell<Input>,
    emitter: RefCell<Emitter>,
    scope: Rc<RefCell<SynthScope>>,
}

/// Shared handle to one ugen instance in a synth.
#[derive(Clone)]
pub struct UGen(Rc<UGenInner>);

impl UGen {
    pub(crate) fn new(key: UGenKey, index: usize, scope: Rc<RefCell<SynthScope>>) -> Self {
        Self(Rc::new(UGenInner {
            key,
            index,
            outlet: RefCell::new(Input::default()),
            emitter: RefCell::new(Emitter::new()),
            scope,
        }))
    }

    /// The parsed key this ugen was created with.
    pub fn key(&self) -> &UGenKey {
        &self.0.key
    }

    pub fn name(&self) -> &str {
        &self.0.key.name
    }

    /// Position in the synth's database.
    pub fn index(&self) -> usize {
        self.0.index
    }

    /// What downstream ugens connect to.
    pub fn outlet(&self) -> Input {
        self.0.outlet.borrow().clone()
    }

    pub(crate) fn set_outlet(&self, outlet: Input) {
        *self.0.outlet.borrow_mut() = outlet;
    }

    /// The synth-local state this ugen shares with its siblings.
    pub fn scope(&self) -> &Rc<RefCell<SynthScope>> {
        &self.0.scope
    }

    pub fn ptr_eq(&self, other: &UGen) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Call `listener` on every `event` from this ugen.
    pub fn on(&self, event: &str, listener: Listener) {
        self.0.emitter.borrow_mut().on(event, listener);
    }

    /// Call `listener` on the next `event` only.
    pub fn once(&self, event: &str, listener: Listener) {
        self.0.emitter.borrow_mut().once(event, listener);
    }

    /// Remove a listener added with [`on`](Self::on) or [`once`](Self::once).
    pub fn off(&self, event: &str, listener: &Listener) {
        self.0.emitter.borrow_mut().off(event, listener);
    }

    pub fn has_listeners(&self, event: &str) -> bool {
        self.0.emitter.borrow().has_listeners(event)
    }

    pub fn listeners(&self, event: &str) -> Vec<Listener> {
        self.0.emitter.borrow().listeners(event)
    }

    /// Call the listeners for `event`. Listeners may add or remove
    /// listeners on this ugen while running.
    pub fn emit(&self, ctx: &mut Context, event: &str, playback_time: f64) {
        let listeners = self.0.emitter.borrow_mut().take_for_emit(event);
        if listeners.is_empty() {
            log::trace!("{}: {event} with no listeners", self.0.key);
            return;
        }
        let payload = UGenEvent {
            name: event.to_string(),
            playback_time,
            source: self.0.key.clone(),
        };
        for listener in listeners {
            listener(ctx, &payload);
        }
    }
}

impl fmt::Debug for UGen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UGen")
            .field("key", &self.0.key)
            .field("index", &self.0.index)
            .finish()
    }
}

impl From<&UGen> for Input {
    fn from(ugen: &UGen) -> Self {
        ugen.outlet()
    }
}

impl From<UGen> for Input {
    fn from(ugen: UGen) -> Self {
        ugen.outlet()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_key() {
        let key: UGenKey = "adsr#amp.env.slow".parse().unwrap();
        assert_eq!(key.name, "adsr");
        assert_eq!(key.id.as_deref(), Some("amp"));
        assert_eq!(key.classes, vec!["env", "slow"]);
        assert_eq!(key.to_string(), "adsr#amp.env.slow");
    }

    #[test]
    fn classes_before_id() {
        let key: UGenKey = "sin.lfo#mod".parse().unwrap();
        assert_eq!(key.id.as_deref(), Some("mod"));
        assert!(key.has_class("lfo"));
    }

    #[test]
    fn symbolic_names_parse() {
        let key: UGenKey = "+".parse().unwrap();
        assert_eq!(key, UGenKey::named("+"));
        let key: UGenKey = "local-in".parse().unwrap();
        assert_eq!(key.name, "local-in");
    }

    #[test]
    fn malformed_keys_are_errors() {
        for bad in ["", "#amp", ".env", "sin#", "sin..x", "sin#a#b"] {
            assert!(bad.parse::<UGenKey>().is_err(), "{bad:?} should fail");
        }
    }

    #[test]
    fn second_output_on_same_index_is_summed() {
        let mut graph = Graph::new();
        let mut scope = SynthScope::default();
        let a = graph.gain(1.0);
        let b = graph.gain(1.0);
        scope.set_output(&mut graph, 0, a);
        scope.set_output(&mut graph, 0, b);
        let out = scope.outputs()[&0];
        assert_eq!(graph.inputs(out.into()).collect::<Vec<_>>(), vec![a, b]);
        assert!(scope.is_sink(out));
    }
}
