//! Built-in unit generators.

mod arith;
mod buf;
mod comp;
mod env;
mod inout;
mod iter;
mod osc;

use cadence_ir::finite;

use crate::context::Context;
use crate::input::Input;
use crate::param::Param;
use crate::registry::Registry;
use crate::sum::sum;
use crate::value::Value;

/// Add every built-in ugen to `registry`.
pub fn register_builtins(registry: &mut Registry) {
    arith::register(registry);
    buf::register(registry);
    comp::register(registry);
    env::register(registry);
    inout::register(registry);
    iter::register(registry);
    osc::register(registry);
}

/// Time argument `i` of a method call. Missing or zero means now.
fn arg_time(ctx: &Context, args: &[Value], i: usize) -> f64 {
    let t = args.get(i).map_or(0.0, |v| finite(ctx.to_seconds(v)));
    if t == 0.0 {
        ctx.current_time()
    } else {
        t
    }
}

/// `param` on its own, or a gain carrying `param` fed by the inputs' sum.
fn param_outlet(ctx: &mut Context, param: &Param, inputs: Vec<Input>) -> Input {
    if inputs.is_empty() {
        return param.clone().into();
    }
    let gain = ctx.graph_mut().gain(0.0);
    ctx.connect(&sum(inputs), gain);
    ctx.connect_param(&param.clone().into(), gain, "gain");
    Input::Node(gain)
}
