//! `buf`: plays a [`Buffer`](cadence_ir::Buffer).
//!
//! The node starts and stops when the scheduler reaches the requested
//! times, with `offset` and `duration` passed through to the start call.

use cadence_ir::{finite, NodeKind, StartCall};

use crate::error::EngineError;
use crate::input::Input;
use crate::registry::Registry;
use crate::spec::{Spec, SpecValue};
use crate::sum::sum;
use crate::unit::Unit;

pub(super) fn register(registry: &mut Registry) {
    registry.register("buf", |ctx, ugen, spec, inputs| {
        let buffer = match spec.get("buffer") {
            None => None,
            Some(SpecValue::Buffer(buffer)) => Some(buffer.clone()),
            Some(_) => {
                return Err(EngineError::invalid_spec(ugen.name(), "`buffer` is not a buffer"))
            }
        };
        let node = ctx.graph_mut().create(NodeKind::BufferSource {
            buffer,
            looping: spec.flag("loop"),
            loop_start: finite(spec.number_or("loopStart", 0.0)),
            loop_end: finite(spec.number_or("loopEnd", 0.0)),
        });

        let mut rate = vec![playback_rate(spec)];
        rate.extend(inputs);
        ctx.connect_param(&sum(rate), node, "playbackRate");

        let offset = spec.number("offset");
        let duration = spec.number("duration");
        Ok(Unit::new(node)
            .on_start(move |ctx, t| {
                ctx.sched(t, move |ctx, t| {
                    let call = StartCall {
                        time: t,
                        offset,
                        duration,
                    };
                    ctx.graph_mut().start(node, call);
                });
            })
            .on_stop(move |ctx, t| {
                ctx.sched(t, move |ctx, t| {
                    ctx.graph_mut().stop(node, t);
                });
            }))
    });
}

fn playback_rate(spec: &Spec) -> Input {
    spec.input("rate")
        .or_else(|| spec.input("playbackRate"))
        .unwrap_or(Input::Number(1.0))
}
