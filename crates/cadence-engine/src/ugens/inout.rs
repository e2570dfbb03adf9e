//! Bus access: `in`, `out`, `local-in` and `local-out`.
//!
//! `in` and `out` use the context's shared buses, audio rate by default or
//! control rate with `rate: "control"`. The local pair uses buses private
//! to the synth, which is how feedback loops are built.

use std::cell::RefCell;
use std::rc::Rc;

use cadence_ir::Graph;

use crate::input::{Input, Link};
use crate::registry::Registry;
use crate::spec::Spec;
use crate::sum::sum;
use crate::unit::Unit;

pub(super) fn register(registry: &mut Registry) {
    registry.register("in", |ctx, _, spec, inputs| {
        let index = bus_index(ctx.graph(), spec, &inputs);
        let bus = if is_control(spec) {
            ctx.get_control_bus(index)
        } else {
            ctx.get_audio_bus(index)
        };
        Ok(Unit::new(bus))
    });

    registry.register("out", |ctx, ugen, spec, inputs| {
        let index = out_index(spec);
        let node = sum(inputs).to_node(ctx.graph_mut());
        ugen.scope().borrow_mut().mark_sink(node);
        if !is_control(spec) {
            ugen.scope()
                .borrow_mut()
                .set_output(ctx.graph_mut(), index, node);
            return Ok(Unit::new(node));
        }

        let link: Rc<RefCell<Option<Link>>> = Rc::default();
        let on_stop = link.clone();
        Ok(Unit::new(node)
            .on_start(move |ctx, _| {
                let bus = ctx.get_control_bus(index);
                *link.borrow_mut() = Some(ctx.connect_param(&Input::Node(node), bus, "gain"));
            })
            .on_stop(move |ctx, t| {
                let on_stop = on_stop.clone();
                ctx.sched(t, move |ctx, _| {
                    if let Some(link) = on_stop.borrow_mut().take() {
                        link.disconnect(ctx.graph_mut());
                    }
                });
            }))
    });

    registry.register("local-in", |ctx, ugen, spec, inputs| {
        let index = bus_index(ctx.graph(), spec, &inputs).clamp(0, MAX_LOCAL_BUS) as usize;
        let bus = ugen.scope().borrow_mut().local_bus(ctx.graph_mut(), index);
        Ok(Unit::new(bus))
    });

    registry.register("local-out", |ctx, ugen, spec, inputs| {
        let index = out_index(spec).min(MAX_LOCAL_BUS) as usize;
        let node = sum(inputs).to_node(ctx.graph_mut());
        let bus = ugen.scope().borrow_mut().local_bus(ctx.graph_mut(), index);
        ctx.graph_mut().connect(node, bus.into());
        Ok(Unit::new(node))
    });
}

/// Highest synth-local bus index.
const MAX_LOCAL_BUS: i64 = crate::config::MAX_BUSES as i64;

fn is_control(spec: &Spec) -> bool {
    spec.text("rate") == Some("control")
}

/// `bus` for a writer; never negative. Context buses clamp the top end.
fn out_index(spec: &Spec) -> i64 {
    spec.number("bus").unwrap_or(0.0).round().max(0.0) as i64
}

/// `bus` when given, else the first input if it is a plain number.
fn bus_index(graph: &Graph, spec: &Spec, inputs: &[Input]) -> i64 {
    spec.number("bus")
        .or_else(|| inputs.first().and_then(|i| i.constant_value(graph)))
        .unwrap_or(0.0)
        .round() as i64
}
