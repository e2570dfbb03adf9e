//! The envelope engine.
//!
//! Walks an [`EnvelopeTable`] segment by segment, programming exponential
//! approaches on a [`Param`] and scheduling itself for the next segment.
//! A segment's curve is the fraction of the distance still left after its
//! nominal duration; the time constant follows from that.
//!
//! The release segment is never entered by falling through. Progress
//! stops in front of it (or loops back to the loop node) until
//! [`Envelope::release`] is called.

use std::cell::RefCell;
use std::rc::Rc;

use cadence_ir::{clip, finite, EnvelopeTable, MIN_CURVE};

use crate::context::Context;
use crate::event_queue::SchedId;
use crate::param::Param;
use crate::unit::TimeFn;

/// Floor applied to durations and magnitudes inside logarithms.
const EPSILON: f64 = 1e-6;

struct EnvelopeState {
    table: EnvelopeTable,
    param: Param,
    index: usize,
    sched: SchedId,
    release_sched: SchedId,
    stopped: bool,
    on_end: Option<TimeFn>,
}

/// Shared handle to a running envelope.
#[derive(Clone)]
pub struct Envelope(Rc<RefCell<EnvelopeState>>);

impl Envelope {
    /// An envelope sitting at the table's initial level.
    pub fn new(table: EnvelopeTable) -> Self {
        let param = Param::new(table.init());
        Self(Rc::new(RefCell::new(EnvelopeState {
            table,
            param,
            index: 0,
            sched: SchedId::NONE,
            release_sched: SchedId::NONE,
            stopped: false,
            on_end: None,
        })))
    }

    /// The driven value.
    pub fn param(&self) -> Param {
        self.0.borrow().param.clone()
    }

    /// Index of the next segment to run.
    pub fn index(&self) -> usize {
        self.0.borrow().index
    }

    /// Called once the terminal segment completes.
    pub fn set_on_end(&self, f: impl Fn(&mut Context, f64) + 'static) {
        self.0.borrow_mut().on_end = Some(Rc::new(f));
    }

    /// Run from the first segment at `t0`. A table whose release node is
    /// the first segment holds its initial level until released.
    pub fn start(&self, ctx: &mut Context, t0: f64) {
        if self.0.borrow().table.release_node() == Some(0) {
            log::trace!("envelope holds at its initial level until release");
            return;
        }
        let env = self.clone();
        ctx.sched(t0, move |ctx, t| env.resume(ctx, t));
    }

    /// Program segment `index` at `t0` and schedule what follows.
    pub fn resume(&self, ctx: &mut Context, t0: f64) {
        let mut state = self.0.borrow_mut();
        let Some(&segment) = state.table.segments().get(state.index) else {
            return;
        };
        state.index += 1;

        let len = state.table.len();
        let duration = finite(segment.duration);
        let v0 = state.param.value_at(t0);
        let v1 = finite(segment.target);
        let curve = clip(finite(segment.curve), MIN_CURVE, 1.0 - MIN_CURVE);
        let mut t1 = t0 + duration;

        if v0 == v1 || duration <= 0.0 {
            state.param.set_at(ctx.graph_mut(), v1, t1);
        } else {
            let v_t = v0 + (v1 - v0) * (1.0 - curve);
            let tau = -duration.max(EPSILON) / ((v_t - v1) / (v0 - v1)).ln();
            if state.index == len {
                let ratio = v1.abs().max(EPSILON) / v0.abs().max(EPSILON);
                t1 = t0 + tau * ratio.ln().abs();
            }
            state.param.target_at(ctx.graph_mut(), v1, t0, tau);
        }

        if let Some((loop_node, release_node)) = state.table.loop_span() {
            if state.index == release_node {
                state.index = loop_node;
            }
        }

        if state.index == len {
            let env = self.clone();
            state.sched = ctx.sched(t1, move |ctx, t| env.finish(ctx, t));
        } else if Some(state.index) != state.table.release_node() {
            let env = self.clone();
            state.sched = ctx.sched(t1, move |ctx, t| env.resume(ctx, t));
        } else {
            state.sched = SchedId::NONE;
        }
    }

    fn finish(&self, ctx: &mut Context, t: f64) {
        let on_end = {
            let mut state = self.0.borrow_mut();
            state.sched = SchedId::NONE;
            state.on_end.clone()
        };
        log::trace!("envelope end at {t:.6}");
        if let Some(f) = on_end {
            f(ctx, t);
        }
    }

    /// Jump to the release segment at `t`.
    ///
    /// Honoured once per envelope, and never after [`stop`](Self::stop).
    pub fn release(&self, ctx: &mut Context, t: f64) {
        let mut state = self.0.borrow_mut();
        if state.stopped
            || state.table.release_node().is_none()
            || !state.release_sched.is_none()
        {
            return;
        }
        let env = self.clone();
        state.release_sched = ctx.sched(finite(t), move |ctx, t| {
            let pending = {
                let mut state = env.0.borrow_mut();
                let pending = state.sched;
                state.sched = SchedId::NONE;
                if let Some(node) = state.table.release_node() {
                    state.index = node;
                }
                pending
            };
            ctx.unsched(pending);
            env.resume(ctx, t);
        });
    }

    /// Hold the current value from `t0` on and drop everything pending.
    pub fn stop(&self, ctx: &mut Context, t0: f64) {
        let (pending, release) = {
            let mut state = self.0.borrow_mut();
            let value = state.param.value_at(t0);
            state.param.cancel(ctx.graph_mut(), t0);
            state.param.set_at(ctx.graph_mut(), value, t0);
            state.index = state.table.len();
            state.stopped = true;
            (
                std::mem::replace(&mut state.sched, SchedId::NONE),
                state.release_sched,
            )
        };
        ctx.unsched(pending);
        ctx.unsched(release);
    }
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.0.borrow();
        f.debug_struct("Envelope")
            .field("table", &state.table)
            .field("index", &state.index)
            .finish()
    }
}
