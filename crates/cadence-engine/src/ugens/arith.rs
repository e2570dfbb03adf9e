//! `number`, `+` and `*`.

use cadence_ir::finite;

use crate::input::Input;
use crate::param::Param;
use crate::registry::Registry;
use crate::sum::{mul, sum};
use crate::unit::Unit;

use super::{arg_time, param_outlet};

pub(super) fn register(registry: &mut Registry) {
    // An automatable constant; with inputs it scales their sum.
    registry.register("number", |ctx, _, spec, inputs| {
        let param = Param::new(spec.number_or("value", 0.0));
        let outlet = param_outlet(ctx, &param, inputs);
        Ok(Unit::new(outlet).method("setValue", move |ctx, args| {
            let t = arg_time(ctx, args, 0);
            let value = args.get(1).and_then(|v| v.as_number()).map_or(0.0, finite);
            param.set_at(ctx.graph_mut(), value, t);
        }))
    });

    registry.register("+", |_, _, _, inputs| Ok(Unit::new(sum(inputs))));

    registry.register("*", |ctx, _, _, inputs| {
        let product = inputs
            .into_iter()
            .fold(Input::Number(1.0), |acc, input| mul(ctx.graph_mut(), acc, input));
        Ok(Unit::new(product))
    });
}
