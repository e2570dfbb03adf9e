//! Synths: one call of a graph description, plus a lifecycle.
//!
//! A [`Synth`] runs its description function exactly once against a
//! [`Builder`]. Every ugen created there lands in the synth's database,
//! which later routes `start`, `stop`, method calls and event listeners.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use cadence_ir::{finite, Buffer, NodeKey};

use crate::context::Context;
use crate::db::{parse_event, DbEntry, SynthDb};
use crate::emitter::Listener;
use crate::error::Result;
use crate::input::{Input, Link};
use crate::spec::Spec;
use crate::sum::{mul, sum};
use crate::timer::{Timer, TimerTick};
use crate::ugen::{SynthScope, UGen, UGenKey};
use crate::unit::{MethodFn, Unit};
use crate::value::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SynthState {
    Unscheduled,
    Scheduled,
    Playing,
    Stopping,
    Finished,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Init,
    Started,
    Stopped,
}

/// The entry point a graph description builds with.
pub struct Builder<'a> {
    ctx: &'a mut Context,
    db: SynthDb,
    methods: BTreeMap<String, MethodFn>,
    timers: Vec<Timer>,
    scope: Rc<RefCell<SynthScope>>,
}

impl<'a> Builder<'a> {
    /// Instantiate the ugen registered under `key`'s name.
    ///
    /// `mul` and `add` in `spec` scale and offset the result.
    pub fn ugen(&mut self, key: &str, spec: Spec, inputs: Vec<Input>) -> Result<UGen> {
        let key: UGenKey = key.parse()?;
        let (factory, renames) = self.ctx.registry().resolve(&key.name)?;
        let mut spec = spec;
        for (from, to) in &renames {
            spec.rename(from, to);
        }

        let ugen = UGen::new(key, self.db.len(), self.scope.clone());
        let mut unit = factory(&mut *self.ctx, &ugen, &spec, inputs)?;

        let mut outlet = unit.outlet().clone();
        if let Some(by) = spec.input("mul") {
            outlet = mul(self.ctx.graph_mut(), outlet, by);
        }
        if let Some(offset) = spec.input("add") {
            outlet = sum(vec![outlet, offset]);
        }
        unit.set_outlet(outlet.clone());
        ugen.set_outlet(outlet);

        log::trace!("synth ugen #{} {}", ugen.index(), ugen.key());
        self.db.push(ugen.clone(), unit);
        Ok(ugen)
    }

    /// A `buf` ugen playing `buffer` with default settings.
    pub fn buffer(&mut self, buffer: Buffer) -> Result<UGen> {
        self.ugen("buf", Spec::new().with("buffer", buffer), Vec::new())
    }

    /// Add a synth-level method. It wins over ugen methods of the same name
    /// in [`Synth::call`].
    pub fn method(&mut self, name: &str, f: impl Fn(&mut Context, &[Value]) + 'static) {
        self.methods.insert(name.to_string(), Rc::new(f));
    }

    /// A one-shot timer that follows this synth's start and stop.
    pub fn timeout(&mut self, secs: f64, f: impl Fn(&mut Context, TimerTick) + 'static) -> Timer {
        let timer = Timer::timeout(secs, f);
        self.timers.push(timer.clone());
        timer
    }

    /// A repeating timer that follows this synth's start and stop.
    pub fn interval(&mut self, secs: f64, f: impl Fn(&mut Context, TimerTick) + 'static) -> Timer {
        let timer = Timer::interval(secs, f);
        self.timers.push(timer.clone());
        timer
    }

    /// The context the synth is being built in.
    pub fn context(&mut self) -> &mut Context {
        self.ctx
    }
}

pub struct Synth {
    db: SynthDb,
    outputs: BTreeMap<i64, NodeKey>,
    links: Rc<RefCell<Vec<Link>>>,
    timers: Vec<Timer>,
    methods: BTreeMap<String, MethodFn>,
    method_names: Vec<String>,
    phase: Phase,
    state: Rc<Cell<SynthState>>,
}

impl Synth {
    /// Run `describe` once and collect what it built.
    ///
    /// A connectable return value that is not already routed becomes
    /// output 0. A synth that routes nothing keeps an empty database.
    pub fn new(
        ctx: &mut Context,
        args: &[Value],
        describe: impl FnOnce(&mut Builder<'_>, &[Value]) -> Result<Option<Input>>,
    ) -> Result<Self> {
        let scope = Rc::new(RefCell::new(SynthScope::default()));
        let mut builder = Builder {
            ctx: &mut *ctx,
            db: SynthDb::new(),
            methods: BTreeMap::new(),
            timers: Vec::new(),
            scope: scope.clone(),
        };
        let result = describe(&mut builder, args)?;
        let Builder {
            mut db,
            methods,
            timers,
            ..
        } = builder;

        let mut scope = scope.borrow_mut();
        if let Some(result) = result.filter(|r| !r.is_number()) {
            let node = result.to_node(ctx.graph_mut());
            if !scope.is_sink(node) {
                scope.replace_output(0, node);
            }
        }
        if scope.outputs().is_empty() && !scope.has_sinks() {
            log::debug!("synth has no outputs, dropping {} ugens", db.len());
            db.clear();
        }

        let mut method_names: Vec<String> = methods.keys().cloned().collect();
        for entry in db.all() {
            method_names.extend(entry.unit.method_names().map(str::to_string));
        }
        method_names.sort();
        method_names.dedup();

        Ok(Self {
            db,
            outputs: scope.outputs().clone(),
            links: Rc::new(RefCell::new(Vec::new())),
            timers,
            methods,
            method_names,
            phase: Phase::Init,
            state: Rc::new(Cell::new(SynthState::Unscheduled)),
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SynthState {
        self.state.get()
    }

    /// Every ugen created by the description.
    pub fn db(&self) -> &SynthDb {
        &self.db
    }

    /// Output nodes by audio bus index.
    pub fn outputs(&self) -> &BTreeMap<i64, NodeKey> {
        &self.outputs
    }

    /// Output 0's node.
    pub fn outlet(&self) -> Option<NodeKey> {
        self.outputs.get(&0).copied()
    }

    /// Every callable method name, sorted.
    pub fn get_methods(&self) -> Vec<String> {
        self.method_names.clone()
    }

    fn resolve_time(ctx: &Context, t: Value) -> f64 {
        match finite(ctx.to_seconds(&t)) {
            t if t == 0.0 => ctx.current_time(),
            t => t,
        }
    }

    /// Start at `t`; 0 means now. Only the first call has any effect.
    pub fn start(&mut self, ctx: &mut Context, t: impl Into<Value>) -> &mut Self {
        if self.phase != Phase::Init {
            return self;
        }
        let t = Self::resolve_time(ctx, t.into());
        self.phase = Phase::Started;
        self.state.set(SynthState::Scheduled);
        log::debug!("synth start at {t:.6}");

        let state = self.state.clone();
        ctx.sched(t, move |_, _| {
            if state.get() == SynthState::Scheduled {
                state.set(SynthState::Playing);
            }
        });

        for (&index, &node) in &self.outputs {
            let bus = ctx.get_audio_bus(index);
            let link = ctx.connect(&Input::Node(node), bus);
            self.links.borrow_mut().push(link);
        }
        for entry in self.db.all() {
            entry.unit.start(ctx, t);
        }
        for timer in &self.timers {
            timer.start(ctx, t);
        }
        ctx.start();
        self
    }

    /// Stop at `t`; 0 means now. Only valid once started.
    pub fn stop(&mut self, ctx: &mut Context, t: impl Into<Value>) -> &mut Self {
        if self.phase != Phase::Started {
            return self;
        }
        let t = Self::resolve_time(ctx, t.into());
        self.phase = Phase::Stopped;
        self.state.set(SynthState::Stopping);
        log::debug!("synth stop at {t:.6}");

        let state = self.state.clone();
        let links = self.links.clone();
        let units: Vec<Rc<Unit>> = self.db.all().iter().map(|e| e.unit.clone()).collect();
        let timers = self.timers.clone();
        ctx.sched(t, move |ctx, t| {
            state.set(SynthState::Finished);
            let links = std::mem::take(&mut *links.borrow_mut());
            ctx.next_tick(move |ctx, _| {
                for link in links {
                    link.disconnect(ctx.graph_mut());
                }
            });
            for unit in &units {
                unit.stop(ctx, t);
            }
            for timer in &timers {
                timer.stop(ctx, t);
            }
        });
        self
    }

    fn targets(&self, event: &str) -> Option<(Vec<&DbEntry>, String)> {
        let Some((selector, name)) = parse_event(event) else {
            log::trace!("synth: malformed event {event:?}");
            return None;
        };
        let targets = match selector {
            Some(selector) => self.db.find(selector),
            None => self.db.all().iter().collect(),
        };
        Some((targets, name.to_string()))
    }

    /// Call `method` (`"label:method"` or `"method"`) on every matching ugen.
    pub fn apply(&self, ctx: &mut Context, method: &str, args: &[Value]) -> &Self {
        if let Some((targets, name)) = self.targets(method) {
            let units: Vec<Rc<Unit>> = targets.iter().map(|e| e.unit.clone()).collect();
            for unit in units {
                unit.apply(ctx, &name, args);
            }
        }
        self
    }

    /// Synth-level method `method` if there is one, otherwise [`apply`](Self::apply).
    pub fn call(&self, ctx: &mut Context, method: &str, args: &[Value]) -> &Self {
        match self.methods.get(method) {
            Some(f) => {
                let f = f.clone();
                f(ctx, args);
                self
            }
            None => self.apply(ctx, method, args),
        }
    }

    /// Listen for `event` on the ugens matched by its selector.
    pub fn on(&self, event: &str, listener: Listener) -> &Self {
        if let Some((targets, name)) = self.targets(event) {
            for entry in targets {
                entry.ugen.on(&name, listener.clone());
            }
        }
        self
    }

    /// Like [`on`](Self::on), but each listener fires only once.
    pub fn once(&self, event: &str, listener: Listener) -> &Self {
        if let Some((targets, name)) = self.targets(event) {
            for entry in targets {
                entry.ugen.once(&name, listener.clone());
            }
        }
        self
    }

    /// Remove `listener` from the ugens matched by the selector.
    pub fn off(&self, event: &str, listener: &Listener) -> &Self {
        if let Some((targets, name)) = self.targets(event) {
            for entry in targets {
                entry.ugen.off(&name, listener);
            }
        }
        self
    }

    /// Whether any matched ugen listens for the event.
    pub fn has_listeners(&self, event: &str) -> bool {
        self.targets(event).is_some_and(|(targets, name)| {
            targets.iter().any(|e| e.ugen.has_listeners(&name))
        })
    }

    /// Distinct listeners across matching ugens, in first-seen order.
    pub fn listeners(&self, event: &str) -> Vec<Listener> {
        let mut found: Vec<Listener> = Vec::new();
        if let Some((targets, name)) = self.targets(event) {
            for entry in targets {
                for listener in entry.ugen.listeners(&name) {
                    if !found.iter().any(|l| Rc::ptr_eq(l, &listener)) {
                        found.push(listener);
                    }
                }
            }
        }
        found
    }
}

impl std::fmt::Debug for Synth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synth")
            .field("state", &self.state.get())
            .field("outputs", &self.outputs)
            .field("ugens", &self.db.len())
            .field("methods", &self.method_names)
            .finish()
    }
}
