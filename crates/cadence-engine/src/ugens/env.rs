//! `env`, `adsr`, `dadsr`, `asr` and `cutoff`.
//!
//! All five drive an [`Envelope`]. Without inputs the outlet is the
//! envelope's param; with inputs it is a gain over their sum whose gain
//! follows the envelope. Method `release(t)`; emits `end`.

use cadence_ir::{finite, EnvToken, EnvelopeTable, Segment, DEFAULT_CURVE};

use crate::context::Context;
use crate::envelope::Envelope;
use crate::error::EngineError;
use crate::input::Input;
use crate::registry::Registry;
use crate::spec::{Spec, SpecValue};
use crate::ugen::UGen;
use crate::unit::Unit;
use crate::value::Value;

use super::{arg_time, param_outlet};

pub(super) fn register(registry: &mut Registry) {
    registry.register("env", |ctx, ugen, spec, inputs| {
        let table =
            table_from_spec(ctx, spec).map_err(|e| EngineError::invalid_spec(ugen.name(), e))?;
        Ok(make(ctx, ugen, table, inputs))
    });
    registry.register("adsr", |ctx, ugen, spec, inputs| {
        let table = EnvelopeTable::adsr(
            time(ctx, spec, &["a", "attackTime"], 0.01),
            time(ctx, spec, &["d", "decayTime"], 0.30),
            spec.first_number(&["s", "sustainLevel"], 0.50),
            time(ctx, spec, &["r", "releaseTime"], 1.00),
            spec.number_or("curve", DEFAULT_CURVE),
        );
        Ok(make(ctx, ugen, table, inputs))
    });
    registry.register("dadsr", |ctx, ugen, spec, inputs| {
        let table = EnvelopeTable::dadsr(
            time(ctx, spec, &["delay", "delayTime"], 0.10),
            time(ctx, spec, &["a", "attackTime"], 0.01),
            time(ctx, spec, &["d", "decayTime"], 0.30),
            spec.first_number(&["s", "sustainLevel"], 0.50),
            time(ctx, spec, &["r", "releaseTime"], 1.00),
            spec.number_or("curve", DEFAULT_CURVE),
        );
        Ok(make(ctx, ugen, table, inputs))
    });
    registry.register("asr", |ctx, ugen, spec, inputs| {
        let table = EnvelopeTable::asr(
            time(ctx, spec, &["a", "attackTime"], 0.01),
            spec.first_number(&["s", "sustainLevel"], 1.00),
            time(ctx, spec, &["r", "releaseTime"], 1.00),
            spec.number_or("curve", DEFAULT_CURVE),
        );
        Ok(make(ctx, ugen, table, inputs))
    });
    registry.register("cutoff", |ctx, ugen, spec, inputs| {
        let table = EnvelopeTable::cutoff(
            time(ctx, spec, &["r", "releaseTime"], 0.1),
            spec.number_or("level", 1.0),
            spec.number_or("curve", DEFAULT_CURVE),
        );
        Ok(make(ctx, ugen, table, inputs))
    });
}

fn time(ctx: &Context, spec: &Spec, keys: &[&str], default: f64) -> f64 {
    keys.iter()
        .find_map(|k| spec.time(k, ctx))
        .map_or(default, finite)
}

fn seconds(ctx: &Context, value: Option<&SpecValue>) -> f64 {
    match value {
        Some(SpecValue::Text(s)) => finite(ctx.to_seconds(&Value::Text(s.clone()))),
        Some(other) => other.as_number().unwrap_or(0.0),
        None => 0.0,
    }
}

/// A node index; negative means none.
fn node_index(spec: &Spec, keys: &[&str]) -> Option<usize> {
    let n = spec.first_number(keys, -1.0);
    (n >= 0.0).then_some(n as usize)
}

/// `table: [[level, duration, curve?], …]` with `init`, `release` and
/// `loop`, or a flat `levels: [init, level, duration, "r", …]` list.
fn table_from_spec(ctx: &Context, spec: &Spec) -> Result<EnvelopeTable, String> {
    let curve = spec.number_or("curve", DEFAULT_CURVE);

    if let Some(rows) = spec.list("table") {
        let segments = rows
            .iter()
            .enumerate()
            .map(|(i, row)| match row {
                SpecValue::List(cells) => Ok(Segment::new(
                    cells.first().and_then(SpecValue::as_number).unwrap_or(0.0),
                    seconds(ctx, cells.get(1)),
                    cells.get(2).and_then(SpecValue::as_number).unwrap_or(curve),
                )),
                _ => Err(format!("table row {i} is not a list")),
            })
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(EnvelopeTable::new(spec.number_or("init", 0.0), segments)
            .with_release(node_index(spec, &["release", "releaseNode"]))
            .with_loop(node_index(spec, &["loop", "loopNode"])));
    }

    let items = spec.list("levels").unwrap_or(&[]);
    let init = items.first().and_then(SpecValue::as_number).unwrap_or(0.0);
    let mut tokens = Vec::new();
    let mut rest = items.iter().skip(1);
    while let Some(item) = rest.next() {
        match item {
            SpecValue::Text(s) if matches!(s.to_ascii_lowercase().as_str(), "r" | "release") => {
                tokens.push(EnvToken::Release)
            }
            SpecValue::Text(s) if matches!(s.to_ascii_lowercase().as_str(), "l" | "loop") => {
                tokens.push(EnvToken::Loop)
            }
            SpecValue::Text(_) => {}
            level => {
                let level = level.as_number().unwrap_or(0.0);
                tokens.push(EnvToken::Level(level, seconds(ctx, rest.next())));
            }
        }
    }
    Ok(EnvelopeTable::from_tokens(init, &tokens, curve))
}

fn make(ctx: &mut Context, ugen: &UGen, table: EnvelopeTable, inputs: Vec<Input>) -> Unit {
    let env = Envelope::new(table);
    let outlet = param_outlet(ctx, &env.param(), inputs);

    let source = ugen.clone();
    env.set_on_end(move |ctx, t| source.emit(ctx, "end", t));

    let (on_start, on_stop, on_release) = (env.clone(), env.clone(), env);
    Unit::new(outlet)
        .on_start(move |ctx, t| on_start.start(ctx, t))
        .on_stop(move |ctx, t| on_stop.stop(ctx, t))
        .method("release", move |ctx, args| {
            let t = arg_time(ctx, args, 0);
            on_release.release(ctx, t);
        })
}
