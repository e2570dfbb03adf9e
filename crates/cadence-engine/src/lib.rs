//! Scheduling and graph composition engine for cadence.
//!
//! A [`Context`] owns the node graph and a sample-clock event queue. Unit
//! generators registered in its [`Registry`] are instantiated by a
//! [`Synth`] description into one graph, and the synth mediates start,
//! stop, method calls and events for them.

mod config;
mod context;
mod db;
mod emitter;
mod envelope;
mod error;
mod event_queue;
mod input;
mod param;
mod registry;
mod spec;
mod sum;
mod synth;
mod timer;
mod transport;
mod ugen;
pub mod ugens;
mod unit;
mod value;

pub use config::{ContextConfig, MAX_BUSES};
pub use context::{render, Callback, Context, ContextState};
pub use db::{parse_event, DbEntry, SynthDb};
pub use emitter::{Emitter, Listener, UGenEvent};
pub use envelope::Envelope;
pub use error::{EngineError, Result};
pub use event_queue::{EventQueue, IdGenerator, SchedId, ScheduledEvent};
pub use input::{Input, Link};
pub use param::Param;
pub use registry::{Factory, Registry, Renames};
pub use spec::{Spec, SpecValue};
pub use sum::{mul, sum, Sum};
pub use synth::{Builder, Synth, SynthState};
pub use timer::{TickFn, Timer, TimerTick, MIN_INTERVAL};
pub use transport::{Transport, MAX_BPM, MIN_BPM, PPQN};
pub use ugen::{SynthScope, UGen, UGenKey};
pub use unit::{MethodFn, TimeFn, Unit};
pub use value::Value;
