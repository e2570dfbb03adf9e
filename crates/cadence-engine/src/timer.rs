//! One-shot and repeating timers that follow a synth's lifecycle.

use std::cell::RefCell;
use std::rc::Rc;

use cadence_ir::finite;

use crate::context::Context;
use crate::event_queue::SchedId;

/// Shortest interval a repeating timer may use.
pub const MIN_INTERVAL: f64 = 0.01;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimerTick {
    pub playback_time: f64,
    /// 1 on the first firing.
    pub count: u64,
}

pub type TickFn = Rc<dyn Fn(&mut Context, TimerTick)>;

struct TimerState {
    period: f64,
    repeat: bool,
    callback: TickFn,
    count: u64,
    sched: SchedId,
    started: bool,
    stopped: bool,
}

#[derive(Clone)]
pub struct Timer(Rc<RefCell<TimerState>>);

impl Timer {
    fn build(period: f64, repeat: bool, callback: impl Fn(&mut Context, TimerTick) + 'static) -> Self {
        Self(Rc::new(RefCell::new(TimerState {
            period,
            repeat,
            callback: Rc::new(callback),
            count: 0,
            sched: SchedId::NONE,
            started: false,
            stopped: false,
        })))
    }

    /// Fire once, `secs` after start.
    pub fn timeout(secs: f64, callback: impl Fn(&mut Context, TimerTick) + 'static) -> Self {
        Self::build(finite(secs).max(0.0), false, callback)
    }

    /// Fire every `secs` after start, first at `start + secs`.
    pub fn interval(secs: f64, callback: impl Fn(&mut Context, TimerTick) + 'static) -> Self {
        Self::build(finite(secs).max(MIN_INTERVAL), true, callback)
    }

    /// Seconds between ticks.
    pub fn period(&self) -> f64 {
        self.0.borrow().period
    }

    /// How many times the callback has fired.
    pub fn count(&self) -> u64 {
        self.0.borrow().count
    }

    /// Schedule the first tick relative to `t`.
    pub fn start(&self, ctx: &mut Context, t: f64) {
        let mut state = self.0.borrow_mut();
        if state.started {
            return;
        }
        state.started = true;
        let timer = self.clone();
        state.sched = ctx.sched(finite(t) + state.period, move |ctx, t| timer.tick(ctx, t));
    }

    fn tick(&self, ctx: &mut Context, t: f64) {
        let (callback, count) = {
            let mut state = self.0.borrow_mut();
            if state.stopped {
                return;
            }
            state.count += 1;
            state.sched = SchedId::NONE;
            if state.repeat {
                let timer = self.clone();
                state.sched = ctx.sched(t + state.period, move |ctx, t| timer.tick(ctx, t));
            }
            (state.callback.clone(), state.count)
        };
        callback(
            ctx,
            TimerTick {
                playback_time: t,
                count,
            },
        );
    }

    /// Cancel at `t`; ticks scheduled at `t` itself still fire if they
    /// were queued first.
    pub fn stop(&self, ctx: &mut Context, t: f64) {
        let timer = self.clone();
        ctx.sched(finite(t), move |ctx, _| {
            let pending = {
                let mut state = timer.0.borrow_mut();
                state.stopped = true;
                std::mem::replace(&mut state.sched, SchedId::NONE)
            };
            ctx.unsched(pending);
        });
    }
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.0.borrow();
        f.debug_struct("Timer")
            .field("period", &state.period)
            .field("repeat", &state.repeat)
            .field("count", &state.count)
            .finish()
    }
}
