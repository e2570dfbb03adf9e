//! The scheduling context.
//!
//! A [`Context`] owns the node graph, the event queue and the buses, and is
//! advanced one block at a time by whoever drives the audio clock. Within
//! one block, next-tick callbacks run first, then timed events in time
//! order up to and including the block's end.

use cadence_ir::{clip, finite, Graph, NodeKey, NodeKind, ParamRef, Target};
use serde_json::Value as Json;

use crate::config::ContextConfig;
use crate::event_queue::{EventQueue, IdGenerator, ScheduledEvent, SchedId};
use crate::input::{Input, Link};
use crate::registry::Registry;
use crate::transport::Transport;
use crate::value::Value;

/// A scheduled or next-tick callback. Receives the firing time.
pub type Callback = Box<dyn FnOnce(&mut Context, f64)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextState {
    Init,
    Started,
}

pub struct Context {
    config: ContextConfig,
    graph: Graph,
    transport: Transport,
    registry: Registry,
    events: EventQueue<Callback>,
    next_ticks: Vec<Callback>,
    ids: IdGenerator,
    current_time: f64,
    block_duration: f64,
    last_block: Option<f64>,
    state: ContextState,
    hold_start: bool,
    audio_buses: Vec<Option<NodeKey>>,
    control_buses: Vec<Option<NodeKey>>,
    destination: NodeKey,
    analyser: NodeKey,
    master_gain: NodeKey,
    inlet: Option<NodeKey>,
}

impl Context {
    /// Build destination ← analyser ← master gain, then reset.
    pub fn new(config: ContextConfig) -> Self {
        let config = config.validated();
        let mut graph = Graph::new();
        let destination = graph.create(NodeKind::Destination);
        let analyser = graph.create(NodeKind::Analyser);
        let master_gain = graph.gain(1.0);
        graph.connect(master_gain, analyser.into());
        graph.connect(analyser, destination.into());

        let block_duration = match config.render_duration {
            Some(d) => clip(finite(d), 0.0, config.max_render_seconds),
            None => config.block_duration(),
        };

        let mut ctx = Self {
            transport: Transport::new(config.bpm),
            registry: Registry::with_builtins(),
            events: EventQueue::new(),
            next_ticks: Vec::new(),
            ids: IdGenerator::new(),
            current_time: 0.0,
            block_duration,
            last_block: None,
            state: ContextState::Init,
            hold_start: false,
            audio_buses: Vec::new(),
            control_buses: Vec::new(),
            destination,
            analyser,
            master_gain,
            inlet: None,
            graph,
            config,
        };
        ctx.reset();
        ctx
    }

    /// The sanitised configuration this context was built from.
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// The node graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Mutable access to the node graph.
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// The ugen registry synths resolve names against.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Mutable registry, for registering custom ugens and aliases.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Samples per second.
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// The final output node.
    pub fn destination(&self) -> NodeKey {
        self.destination
    }

    /// The analyser between the master gain and the destination.
    pub fn analyser(&self) -> NodeKey {
        self.analyser
    }

    /// The gain every audio bus 0 signal ends up in.
    pub fn master_gain(&self) -> NodeKey {
        self.master_gain
    }

    /// Audio bus 0, wired into the master gain.
    pub fn inlet(&self) -> Option<NodeKey> {
        self.inlet
    }

    /// Whether the clock has been started.
    pub fn state(&self) -> ContextState {
        self.state
    }

    /// The authoritative playback time.
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Seconds covered by one call to [`process_block`](Self::process_block).
    pub fn block_duration(&self) -> f64 {
        self.block_duration
    }

    /// Number of timed events still queued.
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Current tempo.
    pub fn bpm(&self) -> f64 {
        self.transport.bpm()
    }

    /// Change the tempo. Out-of-range values are clamped.
    pub fn set_bpm(&mut self, bpm: f64) {
        self.transport.set_bpm(bpm);
    }

    /// A number of seconds, or a musical duration like `"4n"`, in seconds.
    pub fn to_seconds(&self, value: &Value) -> f64 {
        self.transport.to_seconds(value)
    }

    /// A number, `"440hz"` or a musical duration, in Hz.
    pub fn to_frequency(&self, value: &Value) -> f64 {
        self.transport.to_frequency(value)
    }

    /// Schedule `callback` at `time`. Non-finite times collapse to 0.
    ///
    /// Events at equal times fire in the order they were scheduled.
    pub fn sched(&mut self, time: f64, callback: impl FnOnce(&mut Context, f64) + 'static) -> SchedId {
        self.sched_boxed(time, Some(Box::new(callback)))
    }

    /// Schedule an optional callback; `None` returns [`SchedId::NONE`].
    pub fn sched_boxed(&mut self, time: f64, callback: Option<Callback>) -> SchedId {
        let Some(callback) = callback else {
            log::trace!("sched: no callback, ignored");
            return SchedId::NONE;
        };
        let id = self.ids.next_id();
        let time = finite(time);
        log::trace!("sched #{} at {time:.6}", id.get());
        self.events.push(ScheduledEvent {
            id,
            time,
            payload: callback,
        });
        id
    }

    /// Cancel a scheduled event. Unknown ids and `NONE` are ignored.
    pub fn unsched(&mut self, id: SchedId) -> SchedId {
        if self.events.cancel(id) {
            log::trace!("unsched #{}", id.get());
        }
        id
    }

    /// Run `callback` once at the start of the next block, before timed events.
    pub fn next_tick(&mut self, callback: impl FnOnce(&mut Context, f64) + 'static) {
        self.next_ticks.push(Box::new(callback));
    }

    /// Drop pending work and buses, and re-create audio bus 0 as the inlet.
    pub fn reset(&mut self) {
        if let Some(inlet) = self.inlet.take() {
            self.graph.disconnect(inlet);
        }
        self.audio_buses = vec![None; self.config.max_audio_buses + 1];
        self.control_buses = vec![None; self.config.max_control_buses + 1];
        let inlet = self.get_audio_bus(0);
        self.graph.connect(inlet, self.master_gain.into());
        self.inlet = Some(inlet);

        self.events.clear();
        self.next_ticks.clear();
        self.state = ContextState::Init;
        self.current_time = 0.0;
        self.last_block = None;
        log::debug!("context reset");
    }

    /// Begin running the clock. Offline contexts render their single block
    /// immediately. Calling it again does nothing.
    pub fn start(&mut self) {
        if self.state != ContextState::Init || self.hold_start {
            return;
        }
        self.state = ContextState::Started;
        match self.config.render_duration {
            Some(d) => {
                self.block_duration = clip(finite(d), 0.0, self.config.max_render_seconds);
                log::debug!("context start: offline, {:.3}s", self.block_duration);
                self.process_block(0.0);
            }
            None => {
                self.block_duration = self.config.block_duration();
                log::debug!("context start: realtime, block {:.6}s", self.block_duration);
            }
        }
    }

    /// Process the block starting at `playback_time`.
    pub fn process_block(&mut self, playback_time: f64) {
        let start = finite(playback_time);
        let end = start + self.block_duration;
        self.current_time = start;
        self.last_block = Some(start);

        for callback in std::mem::take(&mut self.next_ticks) {
            callback(self, start);
        }
        while let Some(event) = self.events.pop_due(end) {
            self.current_time = self.current_time.max(event.time);
            (event.payload)(self, event.time);
        }
    }

    /// Process the block after the last one, or the first block at 0.
    pub fn advance(&mut self) {
        let next = self
            .last_block
            .map_or(0.0, |t| t + self.block_duration);
        self.process_block(next);
    }

    /// Audio bus `index`, clamped into range and created on first use.
    pub fn get_audio_bus(&mut self, index: i64) -> NodeKey {
        let max = i64::try_from(self.config.max_audio_buses).unwrap_or(i64::MAX);
        let index = index.clamp(0, max) as usize;
        if let Some(bus) = self.audio_buses[index] {
            return bus;
        }
        let bus = self.graph.gain(1.0);
        self.audio_buses[index] = Some(bus);
        bus
    }

    /// Control bus `index`: a zero gain fed by a unit constant, so whatever
    /// drives its `gain` parameter is the bus value.
    pub fn get_control_bus(&mut self, index: i64) -> NodeKey {
        let max = i64::try_from(self.config.max_control_buses).unwrap_or(i64::MAX);
        let index = index.clamp(0, max) as usize;
        if let Some(bus) = self.control_buses[index] {
            return bus;
        }
        let bus = self.graph.gain(0.0);
        let one = self.graph.constant(1.0);
        self.graph.connect(one, bus.into());
        self.control_buses[index] = Some(bus);
        bus
    }

    /// Connect any input to a node or parameter.
    pub fn connect(&mut self, from: &Input, to: impl Into<Target>) -> Link {
        from.connect(&mut self.graph, to.into())
    }

    /// Remove every outgoing connection of `from`.
    pub fn disconnect(&mut self, from: &Input) {
        from.disconnect(&mut self.graph);
    }

    /// Set a node parameter from any input.
    pub fn connect_param(&mut self, from: &Input, node: NodeKey, name: &'static str) -> Link {
        self.connect(from, ParamRef::new(node, name))
    }

    /// JSON description of `node` and everything feeding it.
    pub fn describe(&self, node: NodeKey) -> Json {
        self.graph.describe(node)
    }
}

/// Build an offline context, let `f` populate it, then render.
///
/// Starts requested inside `f` are held until `f` returns.
pub fn render(config: ContextConfig, duration: f64, f: impl FnOnce(&mut Context)) -> Context {
    let mut ctx = Context::new(ContextConfig {
        render_duration: Some(duration),
        ..config
    });
    ctx.hold_start = true;
    f(&mut ctx);
    ctx.hold_start = false;
    ctx.start();
    ctx
}
