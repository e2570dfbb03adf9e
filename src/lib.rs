//! Declarative audio graph construction and sample-clock scheduling.
//!
//! This crate re-exports the two workspace members: [`ir`] holds the plain
//! data (node arena, automation timelines, buffers, envelope tables) and
//! [`engine`] the scheduler, graph coercion, ugen registry and synths.
//!
//! ```no_run
//! use cadence::{Context, ContextConfig, Spec, Synth};
//!
//! let mut ctx = Context::new(ContextConfig::default());
//! let mut synth = Synth::new(&mut ctx, &[], |b, _| {
//!     let osc = b.ugen("sin", Spec::new().with("freq", 220.0), vec![])?;
//!     let env = b.ugen("adsr#amp", Spec::new().with("r", 0.5), vec![osc.outlet()])?;
//!     Ok(Some(env.outlet()))
//! })?;
//! synth.start(&mut ctx, 0.0);
//! synth.apply(&mut ctx, "#amp:release", &[1.0.into()]);
//! ctx.advance();
//! # Ok::<(), cadence::EngineError>(())
//! ```

pub use cadence_engine as engine;
pub use cadence_ir as ir;

pub use cadence_engine::{
    render, Builder, Context, ContextConfig, EngineError, Input, Param, Registry, Spec, SpecValue,
    Synth, SynthState, UGen, UGenEvent, Unit, Value,
};
pub use cadence_ir::{Buffer, BufferError, EnvelopeTable, Graph, NodeKey, NodeKind};
