//! `iter`: steps through a list of values.
//!
//! The first value is taken on start, the rest one per `next(t)`. With
//! `tC` above zero each step glides exponentially with that time
//! constant. Emits `end` when the list runs out.

use std::cell::RefCell;
use std::rc::Rc;

use cadence_ir::finite;

use crate::context::Context;
use crate::param::Param;
use crate::registry::Registry;
use crate::spec::SpecValue;
use crate::ugen::UGen;
use crate::unit::Unit;
use crate::value::Value;

use super::{arg_time, param_outlet};

#[derive(Debug)]
struct Steps {
    values: Vec<f64>,
    pos: usize,
    finished: bool,
}

impl Steps {
    fn pull(&mut self) -> Option<f64> {
        let value = self.values.get(self.pos).copied();
        match value {
            Some(_) => self.pos += 1,
            None => self.finished = true,
        }
        value
    }
}

pub(super) fn register(registry: &mut Registry) {
    registry.register("iter", |ctx, ugen, spec, inputs| {
        let values = spec
            .list("list")
            .unwrap_or(&[])
            .iter()
            .filter_map(SpecValue::as_number)
            .collect();
        let time_constant = spec.number_or("tC", 0.0).max(0.0);
        let steps = Rc::new(RefCell::new(Steps {
            values,
            pos: 0,
            finished: false,
        }));
        let param = Param::new(0.0);
        let outlet = param_outlet(ctx, &param, inputs);

        let start = {
            let (steps, param, ugen) = (steps.clone(), param.clone(), ugen.clone());
            move |ctx: &mut Context, t: f64| {
                let value = steps.borrow_mut().pull();
                match value {
                    Some(v) => param.set_at(ctx.graph_mut(), v, t),
                    None => ugen.emit(ctx, "end", t),
                }
            }
        };
        let next = {
            let (steps, ugen) = (steps.clone(), ugen.clone());
            move |ctx: &mut Context, args: &[Value]| {
                let t = arg_time(ctx, args, 0);
                let (steps, param, ugen) = (steps.clone(), param.clone(), ugen.clone());
                ctx.sched(t, move |ctx, t| step(ctx, &steps, &param, &ugen, time_constant, t));
            }
        };
        let set_value = move |ctx: &mut Context, args: &[Value]| {
            let t = arg_time(ctx, args, 0);
            let values: Vec<f64> = args
                .iter()
                .skip(1)
                .filter_map(Value::as_number)
                .map(finite)
                .collect();
            let steps = steps.clone();
            ctx.sched(t, move |_, _| {
                let mut steps = steps.borrow_mut();
                steps.values = values;
                steps.pos = 0;
                steps.finished = false;
            });
        };

        Ok(Unit::new(outlet)
            .on_start(start)
            .method("next", next)
            .method("setValue", set_value))
    });
}

fn step(ctx: &mut Context, steps: &RefCell<Steps>, param: &Param, ugen: &UGen, tc: f64, t: f64) {
    let value = {
        let mut steps = steps.borrow_mut();
        if steps.finished {
            return;
        }
        steps.pull()
    };
    match value {
        Some(v) if tc > 0.0 => param.target_at(ctx.graph_mut(), v, t, tc),
        Some(v) => param.set_at(ctx.graph_mut(), v, t),
        None => ugen.emit(ctx, "end", t),
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ContextConfig;
    use crate::context::Context;
    use crate::emitter::UGenEvent;
    use crate::spec::Spec;
    use crate::synth::Synth;
    use crate::value::Value;
    use std::cell::Cell;
    use std::rc::Rc;

    fn ctx() -> Context {
        Context::new(ContextConfig {
            sample_rate: 1000,
            block_size: 100,
            ..ContextConfig::default()
        })
    }

    #[test]
    fn steps_then_ends() {
        let mut ctx = ctx();
        let mut synth = Synth::new(&mut ctx, &[], |b, _| {
            let it = b.ugen("iter", Spec::new().with("list", vec![1.0, 2.0]), vec![])?;
            let osc = b.ugen("sin", Spec::new().with("freq", it.outlet()), vec![])?;
            Ok(Some(osc.outlet()))
        })
        .unwrap();
        let ends = Rc::new(Cell::new(0));
        let seen = ends.clone();
        synth.on("iter:end", Rc::new(move |_: &mut Context, _: &UGenEvent| seen.set(seen.get() + 1)));

        let osc = synth.outlet().unwrap();
        synth.start(&mut ctx, 0.0);
        ctx.advance();
        let freq = |ctx: &Context, t: f64| {
            ctx.graph()
                .param(cadence_ir::ParamRef::new(osc, "frequency"))
                .map(|p| p.value_at(t))
        };
        assert_eq!(freq(&ctx, 0.0), Some(1.0));

        synth.apply(&mut ctx, "next", &[Value::Number(0.3)]);
        synth.apply(&mut ctx, "next", &[Value::Number(0.5)]);
        for _ in 0..6 {
            ctx.advance();
        }
        assert_eq!(freq(&ctx, 0.4), Some(2.0));
        assert_eq!(ends.get(), 1);

        synth.apply(&mut ctx, "setValue", &[Value::Number(0.8), Value::Number(7.0)]);
        synth.apply(&mut ctx, "next", &[Value::Number(0.9)]);
        for _ in 0..3 {
            ctx.advance();
        }
        assert_eq!(freq(&ctx, 1.0), Some(7.0));
    }

    #[test]
    fn set_value_takes_levels_not_times() {
        let mut ctx = ctx();
        let mut synth = Synth::new(&mut ctx, &[], |b, _| {
            let it = b.ugen("iter", Spec::new().with("list", vec![1.0]), vec![])?;
            let osc = b.ugen("sin", Spec::new().with("freq", it.outlet()), vec![])?;
            Ok(Some(osc.outlet()))
        })
        .unwrap();
        let osc = synth.outlet().unwrap();
        synth.start(&mut ctx, 0.0);
        synth.apply(
            &mut ctx,
            "setValue",
            &[Value::Number(0.2), "4n".into(), Value::Number(5.0)],
        );
        synth.apply(&mut ctx, "next", &[Value::Number(0.3)]);
        for _ in 0..5 {
            ctx.advance();
        }
        let freq = ctx
            .graph()
            .param(cadence_ir::ParamRef::new(osc, "frequency"))
            .map(|p| p.value_at(0.4));
        assert_eq!(freq, Some(5.0));
    }
}
